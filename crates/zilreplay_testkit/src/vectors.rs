//! Replay test vectors.
//!
//! Each vector is a hex-encoded record plus the outcome it must produce when
//! replayed against [`populated_store`](crate::populated_store). Vectors
//! serialize to JSON so they can be shared with other implementations of the
//! log format.

use serde::{Deserialize, Serialize};
use zilreplay_core::{ReplayError, ReplayOutcome, ReplayResult, TxType};
use zilreplay_store::{Ace, ACE_EVERYONE, ACE_OWNER};

use crate::builders::{self, RecordBuilder};
use crate::fixtures::{DOCS_DIR, NOTES_FILE, README_FILE};

/// The result a vector expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedOutcome {
    /// [`ReplayOutcome::Applied`].
    Applied,
    /// [`ReplayOutcome::AlreadyApplied`].
    AlreadyApplied,
    /// [`ReplayOutcome::TargetMissing`].
    TargetMissing,
    /// A refused record.
    Unsupported,
    /// Any other error.
    Error,
}

impl ExpectedOutcome {
    /// Classifies a replay result.
    pub fn of(result: &ReplayResult<ReplayOutcome>) -> Self {
        match result {
            Ok(ReplayOutcome::Applied) => Self::Applied,
            Ok(ReplayOutcome::AlreadyApplied) => Self::AlreadyApplied,
            Ok(ReplayOutcome::TargetMissing) => Self::TargetMissing,
            Err(err) if err.is_unsupported() => Self::Unsupported,
            Err(_) => Self::Error,
        }
    }
}

/// A test vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestVector {
    /// Unique identifier for this vector.
    pub id: String,
    /// Human-readable description.
    pub description: String,
    /// Record bytes (hex-encoded).
    pub record_hex: String,
    /// Whether the record is in the opposite byte order.
    pub byteswapped: bool,
    /// Expected result.
    pub expected: ExpectedOutcome,
}

impl TestVector {
    fn new(
        id: &str,
        description: &str,
        record: &[u8],
        byteswapped: bool,
        expected: ExpectedOutcome,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            record_hex: hex::encode(record),
            byteswapped,
            expected,
        }
    }

    fn host(id: &str, description: &str, builder: RecordBuilder, expected: ExpectedOutcome) -> Self {
        Self::new(id, description, &builder.build(), false, expected)
    }

    /// Returns the record bytes.
    pub fn record(&self) -> Result<Vec<u8>, hex::FromHexError> {
        hex::decode(&self.record_hex)
    }
}

fn sample_aces() -> Vec<Ace> {
    vec![
        Ace {
            flags: ACE_OWNER,
            access_mask: 0x1f,
            ..Ace::default()
        },
        Ace {
            flags: ACE_EVERYONE,
            access_mask: 0x1,
            ..Ace::default()
        },
    ]
}

/// Vectors covering every transaction type against the populated store.
pub fn replay_vectors() -> Vec<TestVector> {
    use ExpectedOutcome::*;

    let mut vectors = vec![
        TestVector::host(
            "create_new",
            "create docs/new.txt with a fresh id",
            builders::create_file(DOCS_DIR.0, 20, b"new.txt"),
            Applied,
        ),
        TestVector::host(
            "create_existing_id",
            "create whose id is already taken",
            builders::create_file(DOCS_DIR.0, README_FILE.0, b"other.txt"),
            AlreadyApplied,
        ),
        TestVector::host(
            "create_missing_parent",
            "create under a parent that does not exist",
            builders::create_file(99, 20, b"x"),
            Error,
        ),
        TestVector::host(
            "mkdir",
            "mkdir /sub",
            builders::mkdir(1, 21, b"sub"),
            Applied,
        ),
        TestVector::host(
            "symlink",
            "symlink /link -> docs/readme.txt",
            builders::symlink(1, 22, b"link", b"docs/readme.txt"),
            Applied,
        ),
        TestVector::host(
            "remove",
            "remove /notes.txt",
            builders::remove(1, b"notes.txt"),
            Applied,
        ),
        TestVector::host(
            "remove_ci",
            "case-insensitive remove of /NOTES.TXT",
            builders::remove(1, b"NOTES.TXT").case_insensitive(true),
            Applied,
        ),
        TestVector::host(
            "rmdir_not_empty",
            "rmdir of a non-empty directory",
            builders::rmdir(1, b"docs"),
            Error,
        ),
        TestVector::host(
            "link",
            "link /readme to docs/readme.txt",
            builders::link(1, README_FILE.0, b"readme"),
            Applied,
        ),
        TestVector::host(
            "rename",
            "rename /notes.txt to docs/notes.txt",
            builders::rename(1, b"notes.txt", DOCS_DIR.0, b"notes.txt"),
            Applied,
        ),
        TestVector::host(
            "write",
            "write at offset 7 of docs/readme.txt",
            builders::write(README_FILE.0, 7, b"there"),
            Applied,
        ),
        TestVector::host(
            "write_missing",
            "write to a removed object",
            builders::write(42, 0, b"gone"),
            TargetMissing,
        ),
        TestVector::host(
            "truncate",
            "truncate /notes.txt",
            builders::truncate(NOTES_FILE.0, 0, 0),
            Applied,
        ),
        TestVector::host(
            "acl",
            "replace the ACL of /notes.txt",
            builders::acl(NOTES_FILE.0, &sample_aces(), &[], &[]),
            Applied,
        ),
        TestVector::host(
            "acl_v0_missing",
            "legacy ACL on a removed object",
            builders::acl_v0(43, &sample_aces()),
            TargetMissing,
        ),
        TestVector::new(
            "reserved",
            "reserved transaction type 0",
            &RecordBuilder::new(TxType::Reserved).build(),
            false,
            Unsupported,
        ),
        TestVector::new(
            "unknown",
            "transaction type 20",
            &RecordBuilder::new(TxType::Unknown(20)).build(),
            false,
            Unsupported,
        ),
    ];

    let foreign = [
        ("write_foreign", builders::write(README_FILE.0, 0, b"HELLO")),
        (
            "rename_foreign",
            builders::rename(1, b"notes.txt", 1, b"renamed.txt"),
        ),
    ];
    for (id, builder) in foreign {
        if let Ok(record) = builder.build_foreign() {
            vectors.push(TestVector::new(
                id,
                "record in the opposite byte order",
                &record,
                true,
                Applied,
            ));
        }
    }
    vectors
}

/// Serializes vectors to pretty JSON.
pub fn to_json(vectors: &[TestVector]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(vectors)
}

/// Parses vectors from JSON.
pub fn from_json(json: &str) -> serde_json::Result<Vec<TestVector>> {
    serde_json::from_str(json)
}

/// Returns true if `err` is the error a vector marked [`ExpectedOutcome::Error`]
/// may legitimately produce: a store or decode failure, never a refusal.
pub fn is_replay_failure(err: &ReplayError) -> bool {
    !err.is_unsupported() && !err.is_fatal()
}
