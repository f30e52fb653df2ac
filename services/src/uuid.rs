//! Identifier helpers shared by the ingestion and storage crates.

pub use uuid::Uuid;

/// Deterministic UUIDv5 from an arbitrary string id.
///
/// Used for Qdrant point ids so re-ingesting the same chunk overwrites it.
pub fn stable_uuid(id: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, id.as_bytes())
}

/// Fresh random document id (UUIDv4), unique per upload.
pub fn new_doc_id() -> String {
    Uuid::new_v4().to_string()
}

/// Point id of the `index`-th chunk of a document.
pub fn chunk_point_id(doc_id: &str, index: usize) -> Uuid {
    stable_uuid(&format!("{doc_id}:{index}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_uuid_is_deterministic() {
        assert_eq!(stable_uuid("a"), stable_uuid("a"));
        assert_ne!(stable_uuid("a"), stable_uuid("b"));
    }

    #[test]
    fn chunk_ids_differ_per_doc_and_index() {
        let d = new_doc_id();
        assert_ne!(chunk_point_id(&d, 0), chunk_point_id(&d, 1));
        assert_ne!(chunk_point_id(&d, 0), chunk_point_id(&new_doc_id(), 0));
        assert_eq!(Uuid::parse_str(&d).map(|u| u.get_version_num()).ok(), Some(4));
    }
}
