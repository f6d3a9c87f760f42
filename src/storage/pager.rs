//! Page cache backed by the database file.
//!
//! The pager is the only component that touches the file. Pages are born
//! lazily: the first access to a page either reads it from disk (when the
//! file already holds it) or hands out a zeroed buffer. Resident pages are
//! written back wholesale on close; there is no journal and no partial-write
//! recovery.
use super::btree::Node;
use crate::errors::Error;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, trace};

/// Page size 4 kilobytes because it’s the same size as a page used in
/// the virtual memory systems of most computer architectures.
pub const PAGE_SIZE: usize = 4096;

pub const TABLE_MAX_PAGES: usize = 100;

/// Page cache with lazy read-in and batch flush on close.
///
/// Each resident page sits behind an `Arc<Mutex<..>>` so that several pages
/// can be viewed at once while a leaf split shuffles cells between them. The
/// engine is single-threaded; the mutex is an ownership cell, not a locking
/// protocol.
pub struct Pager {
    file: File,
    file_length: u64,
    num_pages: u32,
    pages: [Option<Arc<Mutex<Node>>>; TABLE_MAX_PAGES],
}

impl Pager {
    /// Opens or creates the database file read-write.
    ///
    /// # Errors
    /// Returns `Error::Storage` if the file length is not a whole number of
    /// pages — the file is corrupt and must not be touched further.
    pub fn open(path: &Path) -> Result<Self, Error> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        let file_length = file.metadata()?.len();

        if file_length % PAGE_SIZE as u64 != 0 {
            return Err(err!(
                Storage,
                "db file is not a whole number of pages; corrupt file"
            ));
        }

        let num_pages = (file_length / PAGE_SIZE as u64) as u32;
        debug!(path = %path.display(), file_length, num_pages, "Opened database file");

        Ok(Pager {
            file,
            file_length,
            num_pages,
            pages: std::array::from_fn(|_| None),
        })
    }

    /// Materializes slot `page_num`, reading the page from disk when the
    /// file already contains it.
    ///
    /// Bumps `num_pages` when a page beyond the current end is touched.
    ///
    /// # Errors
    /// Returns `Error::Storage` when `page_num` is outside the fixed page
    /// table, `Error::Io` when the disk read fails.
    pub fn ensure(&mut self, page_num: u32) -> Result<(), Error> {
        if page_num as usize >= TABLE_MAX_PAGES {
            return Err(err!(
                Storage,
                "page number out of bounds ({} >= {})",
                page_num,
                TABLE_MAX_PAGES
            ));
        }

        if self.pages[page_num as usize].is_none() {
            let mut node = Node::zeroed();
            let pages_on_disk = (self.file_length / PAGE_SIZE as u64) as u32;

            if page_num < pages_on_disk {
                self.file
                    .seek(SeekFrom::Start(page_num as u64 * PAGE_SIZE as u64))?;
                self.file.read_exact(&mut node.data)?;
                trace!(page_num, "Read page from disk");
            }

            self.pages[page_num as usize] = Some(Arc::new(Mutex::new(node)));
            if page_num >= self.num_pages {
                self.num_pages = page_num + 1;
            }
        }

        Ok(())
    }

    /// Borrows a resident page.
    ///
    /// # Errors
    /// Returns `Error::Storage` if the page was never materialized with
    /// [`Pager::ensure`], or if it is already borrowed.
    pub fn get(&self, page_num: u32) -> Result<MutexGuard<'_, Node>, Error> {
        let slot = self
            .pages
            .get(page_num as usize)
            .and_then(|slot| slot.as_ref())
            .ok_or_else(|| err!(Storage, "page {} is not resident", page_num))?;

        slot.try_lock()
            .map_err(|_| err!(Storage, "page {} is already borrowed", page_num))
    }

    /// Writes page `page_num` back to the file, all 4,096 bytes of it.
    ///
    /// # Errors
    /// Returns `Error::Storage` when the slot was never populated.
    pub fn flush(&mut self, page_num: u32) -> Result<(), Error> {
        let slot = self
            .pages
            .get(page_num as usize)
            .and_then(|slot| slot.as_ref())
            .cloned()
            .ok_or_else(|| err!(Storage, "tried to flush unpopulated page {}", page_num))?;

        let node = slot
            .try_lock()
            .map_err(|_| err!(Storage, "page {} is already borrowed", page_num))?;

        self.file
            .seek(SeekFrom::Start(page_num as u64 * PAGE_SIZE as u64))?;
        self.file.write_all(&node.data)?;
        trace!(page_num, "Flushed page");
        Ok(())
    }

    /// Append-only allocation: new pages always go to the end of the file.
    ///
    /// Until deletion exists no page is ever recycled, so the next unused
    /// page number is simply the page count.
    pub fn unused_page_num(&self) -> u32 {
        self.num_pages
    }

    pub fn num_pages(&self) -> u32 {
        self.num_pages
    }

    /// Flushes every resident page in `[0, num_pages)`, syncs the file, and
    /// releases the buffers.
    pub fn close(&mut self) -> Result<(), Error> {
        let mut flushed = 0;
        for page_num in 0..self.num_pages {
            if self.pages[page_num as usize].is_some() {
                self.flush(page_num)?;
                flushed += 1;
            }
        }
        self.file.sync_all()?;
        self.file_length = self.file.metadata()?.len();

        for slot in self.pages.iter_mut() {
            *slot = None;
        }

        info!(flushed, num_pages = self.num_pages, "Flushed database file");
        Ok(())
    }
}
