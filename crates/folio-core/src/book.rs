//! A book: the ordered chapters of one manuscript and which one is open.

use serde::{Deserialize, Deserializer, Serialize};

use crate::document::Document;
use crate::error::EditError;
use crate::types::ChapterId;

/// Ordered chapters, always at least one, with one active.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Book {
    #[serde(deserialize_with = "non_empty_chapters")]
    chapters: Vec<Document>,
    active: ChapterId,
}

fn non_empty_chapters<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<Document>, D::Error> {
    let mut chapters = Vec::<Document>::deserialize(deserializer)?;
    if chapters.is_empty() {
        chapters.push(Document::new(ChapterId(1), "Chapter 1"));
    }
    Ok(chapters)
}

impl Default for Book {
    fn default() -> Self {
        Self::new()
    }
}

impl Book {
    /// A book with one empty chapter.
    pub fn new() -> Self {
        let first = ChapterId(1);
        Self {
            chapters: vec![Document::new(first, "Chapter 1")],
            active: first,
        }
    }

    pub fn from_chapters(chapters: Vec<Document>) -> Option<Self> {
        let active = chapters.first()?.id;
        Some(Self { chapters, active })
    }

    pub fn chapters(&self) -> &[Document] {
        &self.chapters
    }

    pub fn chapter(&self, id: ChapterId) -> Option<&Document> {
        self.chapters.iter().find(|c| c.id == id)
    }

    pub fn chapter_mut(&mut self, id: ChapterId) -> Option<&mut Document> {
        self.chapters.iter_mut().find(|c| c.id == id)
    }

    pub fn active_id(&self) -> ChapterId {
        self.active
    }

    pub fn active(&self) -> &Document {
        self.chapter(self.active).unwrap_or(&self.chapters[0])
    }

    pub fn active_mut(&mut self) -> &mut Document {
        let index = self
            .chapters
            .iter()
            .position(|c| c.id == self.active)
            .unwrap_or(0);
        &mut self.chapters[index]
    }

    /// Append a chapter titled "Chapter N" and make it active.
    pub fn add_chapter(&mut self) -> ChapterId {
        let next = self.chapters.iter().map(|c| c.id.0).max().unwrap_or(0) + 1;
        let id = ChapterId(next);
        self.chapters.push(Document::new(id, format!("Chapter {next}")));
        self.switch_to(id).ok();
        id
    }

    pub fn rename_chapter(
        &mut self,
        id: ChapterId,
        title: impl Into<String>,
    ) -> Result<(), EditError> {
        let chapter = self.chapter_mut(id).ok_or(EditError::UnknownChapter(id))?;
        chapter.title = title.into();
        Ok(())
    }

    /// Remove a chapter. The last remaining chapter cannot be removed.
    ///
    /// Removing the active chapter activates its neighbour.
    pub fn remove_chapter(&mut self, id: ChapterId) -> Result<Document, EditError> {
        let index = self
            .chapters
            .iter()
            .position(|c| c.id == id)
            .ok_or(EditError::UnknownChapter(id))?;
        if self.chapters.len() == 1 {
            return Err(EditError::LastChapter);
        }
        let removed = self.chapters.remove(index);
        if self.active == id {
            self.active = self.chapters[index.min(self.chapters.len() - 1)].id;
        }
        Ok(removed)
    }

    /// Activate another chapter, persisting the current one's pages first.
    pub fn switch_to(&mut self, id: ChapterId) -> Result<(), EditError> {
        if self.chapter(id).is_none() {
            return Err(EditError::UnknownChapter(id));
        }
        self.active_mut().persist_all();
        self.active = id;
        tracing::debug!(chapter = %id, "switched chapter");
        Ok(())
    }

    pub fn word_count(&self) -> usize {
        self.chapters.iter().map(Document::word_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::Block;

    #[test]
    fn test_add_chapter_becomes_active() {
        let mut book = Book::new();
        let id = book.add_chapter();
        assert_eq!(id, ChapterId(2));
        assert_eq!(book.active_id(), id);
        assert_eq!(book.active().title, "Chapter 2");
    }

    #[test]
    fn test_add_chapter_uses_max_id() {
        let mut book = Book::new();
        book.add_chapter();
        book.add_chapter();
        book.remove_chapter(ChapterId(2)).unwrap();
        assert_eq!(book.add_chapter(), ChapterId(4));
    }

    #[test]
    fn test_remove_last_chapter_rejected() {
        let mut book = Book::new();
        assert!(matches!(
            book.remove_chapter(ChapterId(1)),
            Err(EditError::LastChapter)
        ));
        assert!(matches!(
            book.remove_chapter(ChapterId(9)),
            Err(EditError::UnknownChapter(ChapterId(9)))
        ));
        assert_eq!(book.chapters().len(), 1);
    }

    #[test]
    fn test_remove_active_chapter_activates_neighbour() {
        let mut book = Book::new();
        let second = book.add_chapter();
        book.remove_chapter(second).unwrap();
        assert_eq!(book.active_id(), ChapterId(1));
    }

    #[test]
    fn test_switch_persists_active_chapter() {
        let mut book = Book::new();
        book.active_mut().push_block(0, Block::paragraph("draft")).unwrap();
        book.add_chapter();
        let first = book.chapter(ChapterId(1)).unwrap();
        assert_eq!(first.stored_content(), vec!["<p>draft</p>"]);
    }

    #[test]
    fn test_rename_and_word_count() {
        let mut book = Book::new();
        book.rename_chapter(ChapterId(1), "Prologue").unwrap();
        book.active_mut().push_block(0, Block::paragraph("two words")).unwrap();
        book.add_chapter();
        book.active_mut().push_block(0, Block::paragraph("three more words")).unwrap();
        assert_eq!(book.chapter(ChapterId(1)).unwrap().title, "Prologue");
        assert_eq!(book.word_count(), 5);
        assert!(book.rename_chapter(ChapterId(7), "x").is_err());
    }
}
