use std::collections::{BTreeMap, HashMap};

use super::classify::classify;
use super::enumeration::{SelectedFile, SelectedFileSet};
use super::helpers::path_segments;
use crate::UploadError;

/// A named partition of accepted files destined for one archive and one upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubfolderGroup {
    pub name: String,
    pub files: Vec<SelectedFile>,
    /// Subfolder builds drop the root folder's own segment from entry paths;
    /// whole-folder builds keep it.
    pub strip_root: bool,
}

impl SubfolderGroup {
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    /// Path of `file` inside this group's archive.
    pub fn entry_path(&self, file: &SelectedFile) -> String {
        let segs = path_segments(&file.relative_path);
        if self.strip_root && segs.len() > 1 {
            segs[1..].join("/")
        } else {
            segs.join("/")
        }
    }
}

/// Everything decided before the first byte is read: the ordered groups plus
/// what was left out and why.
#[derive(Clone, Debug, Default)]
pub struct UploadPlan {
    pub root_name: String,
    pub groups: Vec<SubfolderGroup>,
    /// Files outside the media allow-list.
    pub rejected: Vec<SelectedFile>,
    /// Accepted files sitting directly in the root while subfolder groups exist.
    pub loose: Vec<SelectedFile>,
}

impl UploadPlan {
    pub fn accepted_count(&self) -> usize {
        self.groups.iter().map(|g| g.files.len()).sum()
    }

    pub fn total_size(&self) -> u64 {
        self.groups.iter().map(SubfolderGroup::total_size).sum()
    }
}

/// Group accepted files by the first path segment after the root, keeping
/// discovery order. Falls back to one group named after the root when no file
/// is nested deeper than `root/<file>`.
///
/// Returns the groups and the loose root-level files (empty in fallback mode
/// or when `include_loose` folds them into a trailing root-named group).
pub fn group_by_subfolder(
    root_name: &str,
    accepted: Vec<SelectedFile>,
    include_loose: bool,
) -> (Vec<SubfolderGroup>, Vec<SelectedFile>) {
    let mut groups: Vec<SubfolderGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut loose: Vec<SelectedFile> = Vec::new();

    for f in accepted {
        let segs = path_segments(&f.relative_path);
        if segs.len() > 2 {
            let key = segs[1].to_string();
            let slot = match index.get(&key) {
                Some(&i) => i,
                None => {
                    groups.push(SubfolderGroup {
                        name: key.clone(),
                        files: Vec::new(),
                        strip_root: true,
                    });
                    index.insert(key, groups.len() - 1);
                    groups.len() - 1
                }
            };
            groups[slot].files.push(f);
        } else {
            loose.push(f);
        }
    }

    if groups.is_empty() {
        if loose.is_empty() {
            return (groups, loose);
        }
        let whole =
            SubfolderGroup { name: root_name.to_string(), files: loose, strip_root: false };
        return (vec![whole], Vec::new());
    }

    if include_loose && !loose.is_empty() {
        // a subfolder could share the root's name; keep keys unique
        let mut name = root_name.to_string();
        while index.contains_key(&name) {
            name.push('_');
        }
        groups.push(SubfolderGroup { name, files: loose, strip_root: true });
        return (groups, Vec::new());
    }

    for f in &loose {
        tracing::warn!("root-level file not in any subfolder, skipped: {}", f.relative_path);
    }
    (groups, loose)
}

/// Classify and group one selection. Zero accepted files is a hard stop.
pub fn plan_upload(set: &SelectedFileSet, include_loose: bool) -> Result<UploadPlan, UploadError> {
    let classification = classify(&set.files);
    if classification.accepted.is_empty() {
        return Err(UploadError::SelectionEmpty(set.root_name.clone()));
    }
    let (groups, loose) = group_by_subfolder(&set.root_name, classification.accepted, include_loose);
    Ok(UploadPlan {
        root_name: set.root_name.clone(),
        groups,
        rejected: classification.rejected,
        loose,
    })
}

/// Archive layout of a group: directory (relative to the archive root, `""`
/// for the top level) to the file names it holds. Sent JSON-encoded alongside
/// the archive.
pub fn directory_map(group: &SubfolderGroup) -> BTreeMap<String, Vec<String>> {
    let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for f in &group.files {
        let entry = group.entry_path(f);
        let (dir, name) = match entry.rsplit_once('/') {
            Some((d, n)) => (d.to_string(), n.to_string()),
            None => (String::new(), entry),
        };
        map.entry(dir).or_default().push(name);
    }
    map
}
