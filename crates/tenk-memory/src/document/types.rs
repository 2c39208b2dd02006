use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMetadata {
    /// Path the text was loaded from.
    pub source: String,
    pub company: String,
    pub filename: String,
}

#[derive(Debug, Clone)]
pub struct Document {
    pub content: String,
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Clone)]
pub struct Chunk {
    pub content: String,
    pub metadata: DocumentMetadata,
    pub chunk_index: usize,
}

impl Chunk {
    /// Composite key `"{company}_{chunk_index}"`.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}_{}", self.metadata.company, self.chunk_index)
    }

    /// Stable point id derived from [`Chunk::key`], so re-ingesting a file
    /// overwrites its earlier points instead of duplicating them.
    #[must_use]
    pub fn point_id(&self) -> Uuid {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, self.key().as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(company: &str, idx: usize) -> Chunk {
        Chunk {
            content: "text".into(),
            metadata: DocumentMetadata {
                source: format!("/tmp/{company}.txt"),
                company: company.into(),
                filename: format!("{company}.txt"),
            },
            chunk_index: idx,
        }
    }

    #[test]
    fn key_joins_company_and_index() {
        assert_eq!(chunk("Apple Inc", 3).key(), "Apple Inc_3");
    }

    #[test]
    fn point_id_is_deterministic_and_distinct() {
        assert_eq!(chunk("Apple", 0).point_id(), chunk("Apple", 0).point_id());
        assert_ne!(chunk("Apple", 0).point_id(), chunk("Apple", 1).point_id());
        assert_ne!(chunk("Apple", 0).point_id(), chunk("Alphabet", 0).point_id());
    }
}
