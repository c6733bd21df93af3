use std::{
    fs::{self, ReadDir},
    io,
    path::{Path, PathBuf},
};

pub type Result<T> = std::result::Result<T, Error>;

type Msg = &'static str;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0} ({1}): {2}")]
    SingleIO(Msg, PathBuf, #[source] io::Error),

    #[error("Refusing to overwrite existing file '{0}'")]
    AlreadyExists(PathBuf),
}

#[must_use]
pub fn mkdir_all(path: impl AsRef<Path>) -> Result<()> {
    let dir = path.as_ref();
    fs::create_dir_all(dir).map_err(|e| Error::SingleIO("Cannot create dir", dir.to_owned(), e))
}

#[must_use]
pub fn read_to_string(filepath: impl AsRef<Path>) -> Result<String> {
    fs::read_to_string(&filepath)
        .map_err(|e| Error::SingleIO("Cannot read file", filepath.as_ref().to_owned(), e))
}

#[must_use]
pub fn read_dir(dir: impl AsRef<Path>) -> Result<ReadDir> {
    fs::read_dir(&dir).map_err(|e| Error::SingleIO("Cannot read dir", dir.as_ref().to_owned(), e))
}

/// Writes `contents` to a new file, creating parent dirs. Fails if the file already exists.
#[must_use]
pub fn write_new_with_mkdir<P, C>(filepath: P, contents: C) -> Result<()>
where
    P: AsRef<Path>,
    C: AsRef<[u8]>,
{
    let filepath = filepath.as_ref();
    if filepath.exists() {
        return Err(Error::AlreadyExists(filepath.to_owned()));
    }
    if let Some(dir) = filepath.parent() {
        self::mkdir_all(dir)?;
    }
    fs::write(filepath, contents)
        .map_err(|e| Error::SingleIO("Cannot write file", filepath.to_owned(), e))
}

/// Regular files directly under `dir` (no recursion). Unreadable entries are skipped.
pub fn list_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in self::read_dir(&dir)?.filter_map(std::result::Result::ok) {
        let Ok(ft) = entry.file_type() else {
            continue
        };
        if ft.is_file() {
            files.push(entry.path());
        }
    }
    Ok(files)
}
