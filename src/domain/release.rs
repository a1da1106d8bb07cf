use semver::Version;
use std::fmt;

use crate::error::{ReleaseNotesError, Result};

/// Where a release's candidate commits start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeBases {
    /// Every commit on the target since this ref
    Since(String),
    /// Commits since `base`, minus whatever is already released on `sibling`
    SinceExcluding { base: String, sibling: String },
}

impl MergeBases {
    /// The "since this ref" boundary
    pub fn primary(&self) -> &str {
        match self {
            MergeBases::Since(base) => base,
            MergeBases::SinceExcluding { base, .. } => base,
        }
    }

    /// The already-released sibling branch, if any
    pub fn excluded(&self) -> Option<&str> {
        match self {
            MergeBases::Since(_) => None,
            MergeBases::SinceExcluding { sibling, .. } => Some(sibling),
        }
    }

    /// Build from an ordered list of one or two refs.
    pub fn from_refs<S: AsRef<str>>(refs: &[S]) -> Result<Self> {
        match refs {
            [base] => Ok(MergeBases::Since(base.as_ref().to_string())),
            [base, sibling] => Ok(MergeBases::SinceExcluding {
                base: base.as_ref().to_string(),
                sibling: sibling.as_ref().to_string(),
            }),
            _ => Err(ReleaseNotesError::config(format!(
                "expected one or two merge bases, got {}",
                refs.len()
            ))),
        }
    }
}

/// Describes one release under construction.
///
/// Immutable: workflow stages derive new instances (see [`ReleaseMetadata::without_patch`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseMetadata {
    release: Option<String>,
    merge_bases: MergeBases,
    target_branch: String,
}

impl ReleaseMetadata {
    pub fn new(
        release: Option<&str>,
        merge_bases: MergeBases,
        target_branch: impl Into<String>,
    ) -> Self {
        ReleaseMetadata {
            release: release.map(|r| r.trim_start_matches('v').to_string()),
            merge_bases,
            target_branch: target_branch.into(),
        }
    }

    /// Metadata including all authors since the previous release series split off.
    ///
    /// Without a patch number this is a development release `0.major.minor`.
    pub fn comprehensive(major: u64, minor: u64, patch: Option<u64>) -> Self {
        let (major, minor, patch, prev) = match patch {
            None => (0, major, minor, format!("0.{}.0", major)),
            Some(patch) => (major, minor, patch, format!("{}.{}.0", major, minor)),
        };
        let release = format!("{}.{}.{}", major, minor, patch);
        ReleaseMetadata {
            merge_bases: MergeBases::Since(format!("v{}-dev^", prev)),
            target_branch: format!("v{}", release),
            release: Some(release),
        }
    }

    pub fn release(&self) -> Option<&str> {
        self.release.as_deref()
    }

    pub fn merge_bases(&self) -> &MergeBases {
        &self.merge_bases
    }

    pub fn target_branch(&self) -> &str {
        &self.target_branch
    }

    /// The release string, required once notes are rendered
    pub fn require_release(&self) -> Result<&str> {
        self.release
            .as_deref()
            .ok_or_else(|| ReleaseNotesError::version("release version is not set"))
    }

    /// Parsed `(major, minor, patch)`, or `None` when no release is set
    pub fn version(&self) -> Result<Option<(u64, u64, u64)>> {
        let Some(release) = &self.release else {
            return Ok(None);
        };
        let v = Version::parse(release)
            .map_err(|e| ReleaseNotesError::version(format!("'{}': {}", release, e)))?;
        Ok(Some((v.major, v.minor, v.patch)))
    }

    /// A release opening a new series (patch component zero)
    pub fn is_major(&self) -> bool {
        matches!(self.version(), Ok(Some((_, _, 0))))
    }

    /// Derive the metadata for the series this release belongs to.
    pub fn without_patch(&self) -> Result<Self> {
        let (major, minor, _) = self
            .version()?
            .ok_or_else(|| ReleaseNotesError::version("release version is not set"))?;
        Ok(ReleaseMetadata {
            release: Some(format!("{}.{}.0", major, minor)),
            ..self.clone()
        })
    }
}

impl fmt::Display for ReleaseMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let release = self.release.as_deref().unwrap_or("(unreleased)");
        match &self.merge_bases {
            MergeBases::Since(base) => {
                write!(f, "{}: {}..{}", release, base, self.target_branch)
            }
            MergeBases::SinceExcluding { base, sibling } => write!(
                f,
                "{}: {}..{} excluding {}",
                release, base, self.target_branch, sibling
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parsing() {
        let md = ReleaseMetadata::new(
            Some("v1.2.3"),
            MergeBases::Since("v1.2.0".into()),
            "main",
        );
        assert_eq!(md.release(), Some("1.2.3"));
        assert_eq!(md.version().unwrap(), Some((1, 2, 3)));
        assert!(!md.is_major());
    }

    #[test]
    fn test_major_when_patch_zero() {
        let md = ReleaseMetadata::new(Some("0.6.0"), MergeBases::Since("v0.5.0".into()), "develop");
        assert!(md.is_major());
    }

    #[test]
    fn test_unreleased_is_not_major() {
        let md = ReleaseMetadata::new(None, MergeBases::Since("v0.5.0".into()), "develop");
        assert_eq!(md.version().unwrap(), None);
        assert!(!md.is_major());
        assert!(md.require_release().is_err());
    }

    #[test]
    fn test_bad_version_is_error() {
        let md = ReleaseMetadata::new(Some("one.two"), MergeBases::Since("x".into()), "main");
        assert!(md.version().is_err());
    }

    #[test]
    fn test_comprehensive_release() {
        let md = ReleaseMetadata::comprehensive(1, 2, Some(3));
        assert_eq!(md.release(), Some("1.2.3"));
        assert_eq!(md.merge_bases().primary(), "v1.2.0-dev^");
        assert_eq!(md.target_branch(), "v1.2.3");
    }

    #[test]
    fn test_comprehensive_development_release() {
        let md = ReleaseMetadata::comprehensive(6, 1, None);
        assert_eq!(md.release(), Some("0.6.1"));
        assert_eq!(md.merge_bases().primary(), "v0.6.0-dev^");
        assert_eq!(md.target_branch(), "v0.6.1");
    }

    #[test]
    fn test_without_patch_derives_new_instance() {
        let md = ReleaseMetadata::new(Some("0.6.2"), MergeBases::Since("v0.6.0".into()), "main");
        let series = md.without_patch().unwrap();
        assert_eq!(series.release(), Some("0.6.0"));
        assert_eq!(md.release(), Some("0.6.2"));
        assert_eq!(series.target_branch(), "main");
    }

    #[test]
    fn test_merge_bases_from_refs() {
        assert_eq!(
            MergeBases::from_refs(&["v1.0.0"]).unwrap(),
            MergeBases::Since("v1.0.0".into())
        );
        let two = MergeBases::from_refs(&["v1.0.0", "backports/v1.0"]).unwrap();
        assert_eq!(two.primary(), "v1.0.0");
        assert_eq!(two.excluded(), Some("backports/v1.0"));
        assert!(MergeBases::from_refs::<&str>(&[]).is_err());
        assert!(MergeBases::from_refs(&["a", "b", "c"]).is_err());
    }
}
