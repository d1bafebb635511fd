/// Video container extensions the upload view accepts. Matched case-insensitively.
pub const MEDIA_EXTENSIONS: &[&str] = &[
    "mp4", "webm", "ogg", "mov", "avi", "wmv", "flv", "mkv", "m4v", "mpg", "mpeg", "3gp", "3g2",
];

/// Anything that can be classified: it has a file name and a path relative to
/// the selection root.
pub trait MediaCandidate {
    fn name(&self) -> &str;
    fn relative_path(&self) -> &str;
}

/// A candidate tagged with the classifier's decision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassifiedFile<T> {
    pub file: T,
    pub included: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Classification<T> {
    pub accepted: Vec<T>,
    pub rejected: Vec<T>,
}

impl<T> Default for Classification<T> {
    fn default() -> Self {
        Self { accepted: Vec::new(), rejected: Vec::new() }
    }
}

/// Extension after the last `.`; `None` when the name has no dot.
pub fn extension_of(name: &str) -> Option<&str> {
    name.rsplit_once('.').map(|(_, ext)| ext)
}

pub fn is_media_name(name: &str) -> bool {
    match extension_of(name) {
        Some(ext) => MEDIA_EXTENSIONS.iter().any(|m| m.eq_ignore_ascii_case(ext)),
        None => false,
    }
}

pub fn tag<T: MediaCandidate + Clone>(files: &[T]) -> Vec<ClassifiedFile<T>> {
    files
        .iter()
        .map(|f| ClassifiedFile { file: f.clone(), included: is_media_name(f.name()) })
        .collect()
}

/// Partition `files` into accepted and rejected, preserving input order in both.
pub fn classify<T: MediaCandidate + Clone>(files: &[T]) -> Classification<T> {
    let mut out = Classification::default();
    for c in tag(files) {
        if c.included {
            out.accepted.push(c.file);
        } else {
            tracing::debug!("skip non-video file: {}", c.file.relative_path());
            out.rejected.push(c.file);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq)]
    struct Named(&'static str);

    impl MediaCandidate for Named {
        fn name(&self) -> &str {
            self.0.rsplit('/').next().unwrap_or(self.0)
        }
        fn relative_path(&self) -> &str {
            self.0
        }
    }

    fn names(v: &[Named]) -> Vec<&'static str> {
        v.iter().map(|n| n.0).collect()
    }

    #[test]
    fn mixed_extensions_partition() {
        let input = [Named("root/a.mp4"), Named("root/b.txt"), Named("root/c.mov")];
        let c = classify(&input);
        assert_eq!(names(&c.accepted), vec!["root/a.mp4", "root/c.mov"]);
        assert_eq!(names(&c.rejected), vec!["root/b.txt"]);
    }

    #[test]
    fn case_insensitive_and_last_dot_wins() {
        assert!(is_media_name("CLIP.MP4"));
        assert!(is_media_name("take.final.Mkv"));
        assert!(is_media_name("phone.3G2"));
        assert!(!is_media_name("clip.mp4.txt"));
        assert!(!is_media_name("README"));
        assert!(!is_media_name("archive.mp"));
    }

    #[test]
    fn every_allow_listed_extension_accepted() {
        for ext in MEDIA_EXTENSIONS {
            assert!(is_media_name(&format!("x.{}", ext)), "{} should be accepted", ext);
        }
    }

    #[test]
    fn partition_is_disjoint_complete_and_idempotent() {
        let input = [
            Named("r/1.webm"),
            Named("r/2"),
            Named("r/s/3.ogg"),
            Named("r/s/4.srt"),
            Named("r/s/5.MPEG"),
        ];
        let first = classify(&input);
        assert_eq!(first.accepted.len() + first.rejected.len(), input.len());
        for a in &first.accepted {
            assert!(!first.rejected.contains(a));
        }
        for i in &input {
            assert!(first.accepted.contains(i) || first.rejected.contains(i));
        }
        assert_eq!(classify(&input), first);
    }

    #[test]
    fn empty_input_gives_empty_lists() {
        let c = classify::<Named>(&[]);
        assert!(c.accepted.is_empty() && c.rejected.is_empty());
    }

    #[test]
    fn tag_marks_included() {
        let tagged = tag(&[Named("r/a.avi"), Named("r/b.doc")]);
        assert!(tagged[0].included);
        assert!(!tagged[1].included);
    }
}
