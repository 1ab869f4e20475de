//! Per-handle configuration.
//!
//! Options are fixed when a handle is opened and apply to the whole
//! archive.

use std::fmt;
use std::sync::Arc;

use crate::codec::{DecodePolicy, Decompressor, FlateCodec, RawCodec};
use crate::glob::glob_match;

/// How the central directory scan treats a record whose signature does not
/// match before the declared span is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignaturePolicy {
    /// Keep the records parsed so far and stop scanning.
    #[default]
    Stop,
    /// Fail the whole archive.
    Strict,
}

/// Strip the first path segment of every entry in archives whose file name
/// matches `pattern`.
///
/// Some packagers wrap the whole tree in an extra top-level folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootTrimRule {
    pattern: String,
}

impl RootTrimRule {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Match against the archive's file name (no directories).
    pub fn matches(&self, archive_name: &str) -> bool {
        let file_name = archive_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(archive_name);
        glob_match(&self.pattern, file_name)
    }
}

/// Options for opening an archive.
#[derive(Clone)]
pub struct ArchiveOptions {
    pub root_trim_rules: Vec<RootTrimRule>,
    pub signature_policy: SignaturePolicy,
    pub decode_policy: DecodePolicy,
    pub codec: Arc<dyn RawCodec>,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            root_trim_rules: Vec::new(),
            signature_policy: SignaturePolicy::default(),
            decode_policy: DecodePolicy::default(),
            codec: Arc::new(FlateCodec),
        }
    }
}

impl ArchiveOptions {
    pub fn with_root_trim(mut self, pattern: impl Into<String>) -> Self {
        self.root_trim_rules.push(RootTrimRule::new(pattern));
        self
    }

    pub fn with_signature_policy(mut self, policy: SignaturePolicy) -> Self {
        self.signature_policy = policy;
        self
    }

    pub fn with_decode_policy(mut self, policy: DecodePolicy) -> Self {
        self.decode_policy = policy;
        self
    }

    pub fn with_codec(mut self, codec: Arc<dyn RawCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Whether any root-trim rule applies to `archive_name`.
    pub fn trims_root(&self, archive_name: &str) -> bool {
        self.root_trim_rules
            .iter()
            .any(|rule| rule.matches(archive_name))
    }

    pub(crate) fn decompressor(&self) -> Decompressor {
        Decompressor::new(self.codec.clone(), self.decode_policy)
    }
}

impl fmt::Debug for ArchiveOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveOptions")
            .field("root_trim_rules", &self.root_trim_rules)
            .field("signature_policy", &self.signature_policy)
            .field("decode_policy", &self.decode_policy)
            .finish_non_exhaustive()
    }
}
