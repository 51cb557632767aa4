use objstore_kinds::KindInfo;

use crate::context::StoreContext;
use crate::error::StoreResult;
use crate::model::{
    BatchReadRequest, BatchReadResponse, DanglingReference, DeleteObjectRequest,
    DeleteObjectResponse, ObjectHistoryRequest, ObjectHistoryResponse, ObjectSearchRequest,
    ObjectSearchResponse, ReadObjectRequest, ReadObjectResponse, WriteObjectRequest,
    WriteObjectResponse,
};

/// Storage boundary for versioned objects.
///
/// Every call is scoped to `ctx.tenant_id`. A GRN naming tenant `0` is taken
/// to mean the caller's tenant; any other tenant is rejected.
pub trait ObjectStore: Send + Sync {
    /// Read the current (or a historical) version of one object.
    fn read(&self, ctx: &StoreContext, req: &ReadObjectRequest) -> StoreResult<ReadObjectResponse>;

    /// Read many current objects with uniform flags.
    fn batch_read(&self, ctx: &StoreContext, req: &BatchReadRequest) -> StoreResult<BatchReadResponse>;

    fn write(&self, ctx: &StoreContext, req: &WriteObjectRequest) -> StoreResult<WriteObjectResponse>;

    /// Remove an object together with its history, labels and references.
    fn delete(&self, ctx: &StoreContext, req: &DeleteObjectRequest) -> StoreResult<DeleteObjectResponse>;

    fn history(&self, ctx: &StoreContext, req: &ObjectHistoryRequest) -> StoreResult<ObjectHistoryResponse>;

    fn search(&self, ctx: &StoreContext, req: &ObjectSearchRequest) -> StoreResult<ObjectSearchResponse>;

    /// Stored references of the tenant's current objects that did not resolve.
    fn dangling_references(&self, ctx: &StoreContext) -> StoreResult<Vec<DanglingReference>>;

    /// Kinds this store can hold, sorted by id.
    fn kinds(&self) -> Vec<KindInfo>;
}
