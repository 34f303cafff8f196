//! Physical layer implementations backed by buffers and mapped files.

use std::fs::File;
use std::io;
use std::ops::Range;
use std::path::Path;

use memmap2::Mmap;
use tracing::{debug, info};

use super::{Layer, LayerError, LayerKind};

fn check_bounds(offset: u64, length: usize, layer_len: u64) -> Result<(), LayerError> {
    let end = offset.checked_add(length as u64);
    match end {
        Some(end) if end <= layer_len => Ok(()),
        _ => Err(LayerError::Bounds {
            offset,
            length,
            layer_len,
        }),
    }
}

/// An in-memory physical layer.
///
/// Small captures and test fixtures; everything is mapped.
pub struct BufferLayer {
    name: String,
    data: Vec<u8>,
}

impl BufferLayer {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

impl Layer for BufferLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn kind(&self) -> LayerKind {
        LayerKind::Physical
    }

    fn read(&self, offset: u64, buf: &mut [u8]) -> Result<(), LayerError> {
        check_bounds(offset, buf.len(), self.len())?;
        let start = offset as usize;
        buf.copy_from_slice(&self.data[start..start + buf.len()]);
        Ok(())
    }
}

/// A read-only memory-mapped image file.
pub struct FileLayer {
    name: String,
    map: Mmap,
    _file: File,
}

impl FileLayer {
    /// Map an image file read-only.
    pub fn open(name: impl Into<String>, path: impl AsRef<Path>) -> io::Result<Self> {
        let name = name.into();
        let path = path.as_ref();
        let file = File::open(path)?;
        // Safety: the mapping is read-only and the file handle is held for
        // the lifetime of the layer.
        let map = unsafe { Mmap::map(&file)? };
        info!(layer = %name, ?path, size = map.len(), "mapped image file");
        Ok(Self {
            name,
            map,
            _file: file,
        })
    }
}

impl Layer for FileLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> u64 {
        self.map.len() as u64
    }

    fn kind(&self) -> LayerKind {
        LayerKind::Physical
    }

    fn read(&self, offset: u64, buf: &mut [u8]) -> Result<(), LayerError> {
        check_bounds(offset, buf.len(), self.len())?;
        let start = offset as usize;
        buf.copy_from_slice(&self.map[start..start + buf.len()]);
        Ok(())
    }
}

/// A physical layer with explicit mapped runs, the shape most live-capture
/// formats actually have.
///
/// Reads entirely inside a run succeed; anything touching a gap signals
/// [`LayerError::Unmapped`].
pub struct SparseLayer {
    name: String,
    data: Vec<u8>,
    runs: Vec<Range<u64>>,
}

impl SparseLayer {
    /// `runs` are half-open mapped ranges into `data`, sorted and
    /// non-overlapping.
    pub fn new(name: impl Into<String>, data: Vec<u8>, mut runs: Vec<Range<u64>>) -> Self {
        runs.sort_by_key(|r| r.start);
        let name = name.into();
        debug!(layer = %name, runs = runs.len(), "sparse layer created");
        Self { name, data, runs }
    }

    fn run_containing(&self, offset: u64, length: usize) -> Option<&Range<u64>> {
        let end = offset.checked_add(length as u64)?;
        self.runs
            .iter()
            .find(|r| r.start <= offset && end <= r.end)
    }
}

impl Layer for SparseLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn kind(&self) -> LayerKind {
        LayerKind::Physical
    }

    fn read(&self, offset: u64, buf: &mut [u8]) -> Result<(), LayerError> {
        check_bounds(offset, buf.len(), self.len())?;
        if self.run_containing(offset, buf.len()).is_none() {
            return Err(LayerError::Unmapped {
                offset,
                length: buf.len(),
            });
        }
        let start = offset as usize;
        buf.copy_from_slice(&self.data[start..start + buf.len()]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_buffer_layer_read() {
        let layer = BufferLayer::new("base", b"hello world".to_vec());
        assert_eq!(layer.len(), 11);
        assert_eq!(layer.kind(), LayerKind::Physical);

        let mut buf = [0u8; 5];
        layer.read(6, &mut buf).unwrap();
        assert_eq!(&buf, b"world");
    }

    #[test]
    fn test_buffer_layer_rejects_out_of_bounds() {
        let layer = BufferLayer::new("base", b"hello".to_vec());
        let mut buf = [0u8; 4];
        let err = layer.read(3, &mut buf).unwrap_err();
        assert!(matches!(err, LayerError::Bounds { .. }));

        // Offset overflow must not panic.
        let err = layer.read(u64::MAX, &mut buf).unwrap_err();
        assert!(matches!(err, LayerError::Bounds { .. }));
    }

    #[test]
    fn test_file_layer_read() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"image bytes here").unwrap();

        let layer = FileLayer::open("base", file.path()).unwrap();
        assert_eq!(layer.len(), 16);

        let mut buf = [0u8; 5];
        layer.read(0, &mut buf).unwrap();
        assert_eq!(&buf, b"image");
    }

    #[test]
    fn test_sparse_layer_unmapped_gap() {
        let data = vec![0xAAu8; 32];
        let layer = SparseLayer::new("sparse", data, vec![0..8, 16..32]);

        let mut buf = [0u8; 8];
        layer.read(0, &mut buf).unwrap();
        layer.read(16, &mut buf).unwrap();

        let err = layer.read(8, &mut buf).unwrap_err();
        assert!(matches!(err, LayerError::Unmapped { offset: 8, .. }));

        // Straddling a run boundary is unmapped too.
        let err = layer.read(4, &mut buf).unwrap_err();
        assert!(matches!(err, LayerError::Unmapped { .. }));
    }
}
