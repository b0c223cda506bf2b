// src/session/attachments.rs
//! Files and URLs staged for the next prompt.

use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct FileAttachment {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl FileAttachment {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub async fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Insertion-ordered set of URLs. Duplicates are rejected on insert, so the
/// stored order is the displayed order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderedUrlSet {
    entries: Vec<String>,
}

impl OrderedUrlSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the trimmed URL is empty or already present.
    pub fn insert(&mut self, url: &str) -> bool {
        let url = url.trim();
        if url.is_empty() || self.contains(url) {
            return false;
        }
        self.entries.push(url.to_string());
        true
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.iter().any(|u| u == url)
    }

    pub fn remove(&mut self, index: usize) -> Option<String> {
        (index < self.entries.len()).then(|| self.entries.remove(index))
    }

    pub fn remove_value(&mut self, url: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|u| u != url);
        self.entries.len() != before
    }

    pub fn as_slice(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<'a> FromIterator<&'a str> for OrderedUrlSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut set = Self::new();
        for url in iter {
            set.insert(url);
        }
        set
    }
}

#[derive(Debug, Clone, Default)]
pub struct AttachmentSet {
    files: Vec<FileAttachment>,
    urls: OrderedUrlSet,
}

impl AttachmentSet {
    pub fn files(&self) -> &[FileAttachment] {
        &self.files
    }

    pub fn urls(&self) -> &[String] {
        self.urls.as_slice()
    }

    /// Files are never deduplicated: two picks of the same name are two attachments.
    pub fn add_file(&mut self, file: FileAttachment) {
        self.files.push(file);
    }

    pub fn remove_file(&mut self, index: usize) -> Option<FileAttachment> {
        (index < self.files.len()).then(|| self.files.remove(index))
    }

    pub fn add_url(&mut self, url: &str) -> bool {
        self.urls.insert(url)
    }

    pub fn remove_url(&mut self, index: usize) -> Option<String> {
        self.urls.remove(index)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.urls.is_empty()
    }

    /// Drop the entries that went out with a prompt. Anything staged after the
    /// prompt was sent stays.
    pub fn discard_sent(&mut self, files: &[FileAttachment], urls: &[String]) {
        for sent in files {
            if let Some(index) = self.files.iter().position(|f| f == sent) {
                self.files.remove(index);
            }
        }
        for url in urls {
            self.urls.remove_value(url);
        }
    }

    pub fn clear(&mut self) {
        self.files.clear();
        self.urls.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_keep_first_seen_order_without_duplicates() {
        let urls: OrderedUrlSet = ["a.com", "b.com", "a.com"].into_iter().collect();
        assert_eq!(urls.as_slice(), ["a.com", "b.com"]);
    }

    #[test]
    fn test_url_insert_trims_and_ignores_blank() {
        let mut urls = OrderedUrlSet::new();
        assert!(urls.insert("  https://example.com  "));
        assert!(!urls.insert("https://example.com"));
        assert!(!urls.insert("   "));
        assert_eq!(urls.as_slice(), ["https://example.com"]);
    }

    #[test]
    fn test_remove_url_by_displayed_index() {
        let mut urls: OrderedUrlSet = ["a.com", "b.com", "a.com", "c.com"].into_iter().collect();
        assert_eq!(urls.remove(1).as_deref(), Some("b.com"));
        assert_eq!(urls.as_slice(), ["a.com", "c.com"]);
        assert_eq!(urls.remove(5), None);
        // A removed URL can be added again, at the end.
        assert!(urls.insert("b.com"));
        assert_eq!(urls.as_slice(), ["a.com", "c.com", "b.com"]);
    }

    #[test]
    fn test_files_are_not_deduplicated() {
        let mut set = AttachmentSet::default();
        set.add_file(FileAttachment::new("notes.txt", b"one".to_vec()));
        set.add_file(FileAttachment::new("notes.txt", b"two".to_vec()));
        assert_eq!(set.files().len(), 2);

        let removed = set.remove_file(0).unwrap();
        assert_eq!(removed.bytes, b"one");
        assert_eq!(set.remove_file(3), None);
        assert_eq!(set.files()[0].bytes, b"two");
    }

    #[test]
    fn test_clear_empties_files_and_urls() {
        let mut set = AttachmentSet::default();
        set.add_file(FileAttachment::new("a.pdf", vec![1, 2, 3]));
        set.add_url("a.com");
        assert!(!set.is_empty());
        set.clear();
        assert!(set.is_empty());
        assert!(set.urls().is_empty());
    }

    #[test]
    fn test_discard_sent_keeps_later_entries() {
        let sent_file = FileAttachment::new("a.pdf", vec![1]);
        let mut set = AttachmentSet::default();
        set.add_file(sent_file.clone());
        set.add_url("a.com");
        set.add_file(FileAttachment::new("late.txt", vec![2]));
        set.add_url("late.com");

        set.discard_sent(&[sent_file], &["a.com".to_string()]);
        assert_eq!(set.files(), [FileAttachment::new("late.txt", vec![2])]);
        assert_eq!(set.urls(), ["late.com"]);
    }

    #[tokio::test]
    async fn test_read_file_attachment_from_disk() {
        let path = std::env::temp_dir().join(format!("commbot-attach-{}.txt", std::process::id()));
        tokio::fs::write(&path, b"hello").await.unwrap();
        let file = FileAttachment::read(&path).await.unwrap();
        assert_eq!(file.size(), 5);
        assert!(file.name.starts_with("commbot-attach-"));
        let _ = tokio::fs::remove_file(&path).await;
    }
}
