use super::{normalize, parse_object, str_field, FOLDER};
use crate::builder::SummaryBuilder;
use crate::error::{KindError, KindResult};
use crate::info::KindInfo;
use crate::summary::ObjectSummary;

pub fn info() -> KindInfo {
    KindInfo::new(FOLDER, "Folder")
        .with_description("Group objects together")
        .json()
}

pub struct FolderBuilder;

impl SummaryBuilder for FolderBuilder {
    fn build(&self, uid: &str, body: &[u8]) -> KindResult<(ObjectSummary, Vec<u8>)> {
        let folder = parse_object(FOLDER, body)?;
        let title = str_field(&folder, "title");
        if title.is_empty() {
            return Err(KindError::invalid_body(FOLDER, "folder title is required"));
        }

        let mut summary = ObjectSummary::new(uid, FOLDER);
        summary.set_name(title);
        summary.description = str_field(&folder, "description").to_string();
        Ok((summary, normalize(&folder)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_title_becomes_name() {
        let (summary, _) = FolderBuilder
            .build("f1", br#"{"title":"Team A","description":"dashboards for team a"}"#)
            .unwrap();
        assert_eq!(summary.name, "Team A");
        assert_eq!(summary.slug, "team-a");
        assert_eq!(summary.description, "dashboards for team a");
    }

    #[test]
    fn folder_requires_title() {
        assert!(FolderBuilder.build("f1", br#"{"description":"x"}"#).is_err());
    }
}
