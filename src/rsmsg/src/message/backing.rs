use std::fs::File;
use std::io;

use memmap2::MmapMut;

/// Storage behind a [`Buffer`](super::Buffer).
///
/// A backing owns a contiguous byte region that a buffer appends into. The
/// region may move whenever `set_capacity` runs, so callers must not hold on
/// to slices across a capacity change.
pub trait Backing {
    /// Make at least `cap` bytes addressable. `cap == 0` releases the
    /// region.
    fn set_capacity(&mut self, cap: usize) -> io::Result<()>;

    /// All currently addressable bytes.
    fn bytes(&self) -> &[u8];

    fn bytes_mut(&mut self) -> &mut [u8];

    /// Trim the region to exactly `len` bytes. Called when a message is
    /// finished; no write may follow until the buffer is cleared.
    fn finalize(&mut self, len: usize) -> io::Result<()>;
}

/// Plain heap storage.
pub struct HeapBacking {
    data: Vec<u8>,
}

impl HeapBacking {
    pub fn new() -> HeapBacking {
        HeapBacking { data: Vec::new() }
    }
}

impl Default for HeapBacking {
    fn default() -> HeapBacking {
        HeapBacking::new()
    }
}

impl Backing for HeapBacking {
    fn set_capacity(&mut self, cap: usize) -> io::Result<()> {
        self.data.resize(cap, 0);
        Ok(())
    }

    fn bytes(&self) -> &[u8] {
        &self.data
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    fn finalize(&mut self, len: usize) -> io::Result<()> {
        self.data.truncate(len);
        Ok(())
    }
}

const PAGE_SIZE: usize = 4096;

/// File storage grown by `ftruncate` and memory remapping.
///
/// Capacity requests are rounded up to whole pages. Until `finalize`
/// truncates the file to the final message size, the file holds whatever was
/// last written; callers that need atomicity should write to a temporary
/// path and rename afterwards.
pub struct FileBacking {
    file: File,
    map: Option<MmapMut>,
}

impl FileBacking {
    pub fn new(file: File) -> io::Result<FileBacking> {
        Ok(FileBacking { file, map: None })
    }
}

impl Backing for FileBacking {
    fn set_capacity(&mut self, cap: usize) -> io::Result<()> {
        if cap == 0 {
            self.map = None;
            self.file.set_len(0)?;
            return Ok(());
        }
        let cap = (cap + PAGE_SIZE - 1) / PAGE_SIZE * PAGE_SIZE;
        if self.map.as_ref().map_or(0, |m| m.len()) >= cap {
            return Ok(());
        }
        // Unmap before the file changes length; the new mapping may land at
        // a different address.
        self.map = None;
        self.file.set_len(cap as u64)?;
        // Safety: the file handle is owned by this backing and nothing else
        // writes to it while the mapping is live.
        self.map = Some(unsafe { MmapMut::map_mut(&self.file)? });
        Ok(())
    }

    fn bytes(&self) -> &[u8] {
        self.map.as_deref().unwrap_or(&[])
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        self.map.as_deref_mut().unwrap_or(&mut [])
    }

    fn finalize(&mut self, len: usize) -> io::Result<()> {
        if let Some(map) = &self.map {
            map.flush()?;
        }
        self.map = None;
        self.file.set_len(len as u64)?;
        if len > 0 {
            // Safety: as above; remapped so the finished bytes stay
            // readable after the trim.
            self.map = Some(unsafe { MmapMut::map_mut(&self.file)? });
        }
        Ok(())
    }
}
