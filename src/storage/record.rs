use super::Collection;
use super::Document;
use crate::Result;

/// A typed record persisted as a [`Document`] in a fixed collection.
pub trait Record: Sized {
    const COLLECTION: Collection;

    fn id(&self) -> &str;

    fn to_document(&self) -> Document;

    fn from_document(
        id: &str,
        document: &Document,
    ) -> Result<Self>;
}
