//! Pushed repository unpacking
//!
//! The git front end streams the pushed tree as a tar archive on the
//! receiver's stdin; it is extracted under
//! `{repository_dir}/{username}/{project_name}`.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

pub fn unpack_repository(
    repository_dir: &Path,
    username: &str,
    project_name: &str,
    input: impl Read,
) -> io::Result<PathBuf> {
    let repository_path = repository_dir.join(username).join(project_name);
    fs::create_dir_all(&repository_path)?;

    tar::Archive::new(input).unpack(&repository_path)?;

    Ok(repository_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tarball() -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());

        let mut header = tar::Header::new_gnu();
        header.set_size(12);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "docker-compose.yml", "web:\n  k: v\n".as_bytes())
            .unwrap();

        let mut header = tar::Header::new_gnu();
        header.set_size(14);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "app/server.rb", "puts 'hello'\n\n".as_bytes())
            .unwrap();

        builder.into_inner().unwrap()
    }

    #[test]
    fn unpacks_under_user_and_project() {
        let dir = TempDir::new().unwrap();

        let path = unpack_repository(
            dir.path(),
            "dtan4",
            "dtan4-rails-sample-3e634e41",
            tarball().as_slice(),
        )
        .unwrap();

        assert_eq!(path, dir.path().join("dtan4/dtan4-rails-sample-3e634e41"));
        assert!(path.join("docker-compose.yml").is_file());
        assert!(path.join("app/server.rb").is_file());
    }

    #[test]
    fn garbage_input_is_an_error() {
        let dir = TempDir::new().unwrap();

        let result = unpack_repository(dir.path(), "dtan4", "x", &b"not a tarball"[..]);
        assert!(result.is_err());
    }
}
