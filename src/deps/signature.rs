// src/deps/signature.rs

//! Compile-command fingerprints stored inside dependency records.
//!
//! After a successful compile the engine appends
//! `# dirbuild-signature: <blake3 hex>` to the record. The next run compares
//! it with the signature of the command it would run now, so a change of
//! compiler or flags rebuilds the object even when no file changed.

use std::path::Path;

use anyhow::{Context, Result};
use blake3::Hasher;

use crate::fs::FileSystem;

pub const SIGNATURE_PREFIX: &str = "# dirbuild-signature:";

/// Hash a program name and its arguments.
///
/// Arguments are length-prefixed so `["-I", "a b"]` and `["-I a", "b"]`
/// hash differently.
pub fn command_signature<S: AsRef<str>>(program: &str, args: &[S]) -> String {
    let mut hasher = Hasher::new();
    update_field(&mut hasher, program);
    for arg in args {
        update_field(&mut hasher, arg.as_ref());
    }
    hasher.finalize().to_hex().to_string()
}

fn update_field(hasher: &mut Hasher, field: &str) {
    hasher.update(&(field.len() as u64).to_le_bytes());
    hasher.update(field.as_bytes());
}

/// Append (or replace) the signature line of an existing record.
pub fn stamp_record(fs: &dyn FileSystem, record: &Path, signature: &str) -> Result<()> {
    let content = fs
        .read_to_string(record)
        .with_context(|| format!("reading record {:?} for stamping", record))?;

    let mut stamped: String = content
        .lines()
        .filter(|l| !l.trim_start().starts_with(SIGNATURE_PREFIX))
        .flat_map(|l| [l, "\n"])
        .collect();
    stamped.push_str(SIGNATURE_PREFIX);
    stamped.push(' ');
    stamped.push_str(signature);
    stamped.push('\n');

    fs.write(record, stamped.as_bytes())
        .with_context(|| format!("stamping record {:?}", record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps::depfile::parse_depfile;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn signature_tracks_every_argument() {
        let a = command_signature("cc", &["-O2", "-Wall"]);
        let b = command_signature("cc", &["-O2", "-Wall"]);
        let c = command_signature("cc", &["-O0", "-Wall"]);
        let d = command_signature("clang", &["-O2", "-Wall"]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_ne!(
            command_signature("cc", &["-I", "a b"]),
            command_signature("cc", &["-I a", "b"])
        );
    }

    #[test]
    fn stamping_replaces_previous_signature() {
        let fs = MockFileSystem::new();
        let record = Path::new("./build/obj/a.c.d");
        fs.add_file(record, "a.o: a.c\n# dirbuild-signature: 00ff\n");

        stamp_record(&fs, record, "abcd").unwrap();

        let content = fs.read_to_string(record).unwrap();
        assert_eq!(content.matches(SIGNATURE_PREFIX).count(), 1);
        assert_eq!(parse_depfile(&content).unwrap().signature.as_deref(), Some("abcd"));
    }
}
