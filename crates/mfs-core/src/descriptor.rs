//! Open sessions on a [`File`].

use std::io::{self, SeekFrom};
use std::sync::Arc;

use lock_api::{ArcRwLockReadGuard, ArcRwLockWriteGuard};
use parking_lot::RawRwLock;
use tracing::{debug, warn};

use mfs_modifier::Modifier;
use mfs_store::Node;

use crate::error::{FileError, FileResult};
use crate::file::File;
use crate::mode::OpenMode;

/// The access lock class a descriptor holds, released on drop.
#[allow(dead_code)]
pub(crate) enum AccessGuard {
    Shared(ArcRwLockReadGuard<RawRwLock, ()>),
    Exclusive(ArcRwLockWriteGuard<RawRwLock, ()>),
}

/// One open session on a [`File`].
///
/// Holds the file's access lock from [`File::open`] until [`close`] (or
/// drop), and a modifier bound to the root the file had when the lock was
/// granted. Edits stay private to the descriptor until [`flush`].
///
/// [`close`]: FileDescriptor::close
/// [`flush`]: FileDescriptor::flush
pub struct FileDescriptor {
    file: Arc<File>,
    modifier: Box<dyn Modifier>,
    mode: OpenMode,
    full_sync: bool,
    cursor: u64,
    /// Committed root the parent has not been told about yet.
    pending: Option<Node>,
    access: Option<AccessGuard>,
}

impl FileDescriptor {
    pub(crate) fn new(
        file: Arc<File>,
        modifier: Box<dyn Modifier>,
        mode: OpenMode,
        full_sync: bool,
        access: AccessGuard,
    ) -> Self {
        Self {
            file,
            modifier,
            mode,
            full_sync,
            cursor: 0,
            pending: None,
            access: Some(access),
        }
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn full_sync(&self) -> bool {
        self.full_sync
    }

    pub fn is_closed(&self) -> bool {
        self.access.is_none()
    }

    /// Current cursor offset.
    pub fn position(&self) -> u64 {
        self.cursor
    }

    fn ensure_open(&self) -> FileResult<()> {
        if self.is_closed() {
            return Err(FileError::DescriptorClosed);
        }
        Ok(())
    }

    fn ensure_readable(&self) -> FileResult<()> {
        self.ensure_open()?;
        if !self.mode.is_readable() {
            return Err(FileError::PermissionDenied {
                op: "read",
                mode: self.mode,
            });
        }
        Ok(())
    }

    fn ensure_writable(&self, op: &'static str) -> FileResult<()> {
        self.ensure_open()?;
        if !self.mode.is_writable() {
            return Err(FileError::PermissionDenied { op, mode: self.mode });
        }
        Ok(())
    }

    /// Logical size as seen by this descriptor, unflushed edits included.
    pub fn size(&self) -> FileResult<u64> {
        self.ensure_open()?;
        Ok(self.modifier.size())
    }

    /// Read at `offset` without moving the cursor.
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> FileResult<usize> {
        self.ensure_readable()?;
        Ok(self.modifier.read_at(offset, buf)?)
    }

    /// Write at `offset` without moving the cursor.
    pub fn write_at(&mut self, offset: u64, data: &[u8]) -> FileResult<usize> {
        self.ensure_writable("write")?;
        Ok(self.modifier.write_at(offset, data)?)
    }

    pub fn truncate(&mut self, size: u64) -> FileResult<()> {
        self.ensure_writable("truncate")?;
        self.modifier.truncate(size)?;
        Ok(())
    }

    /// Read at the cursor and advance it.
    pub fn read(&mut self, buf: &mut [u8]) -> FileResult<usize> {
        let n = self.read_at(self.cursor, buf)?;
        self.advance(n)?;
        Ok(n)
    }

    /// Write at the cursor and advance it.
    pub fn write(&mut self, data: &[u8]) -> FileResult<usize> {
        let n = self.write_at(self.cursor, data)?;
        self.advance(n)?;
        Ok(n)
    }

    fn advance(&mut self, n: usize) -> FileResult<()> {
        self.cursor = self
            .cursor
            .checked_add(n as u64)
            .ok_or(FileError::InvalidSeek(i128::from(self.cursor) + n as i128))?;
        Ok(())
    }

    /// Move the cursor. Seeking past the end is allowed; before zero is not.
    pub fn seek(&mut self, pos: SeekFrom) -> FileResult<u64> {
        self.ensure_open()?;
        let (base, delta) = match pos {
            SeekFrom::Start(offset) => {
                self.cursor = offset;
                return Ok(offset);
            }
            SeekFrom::Current(delta) => (self.cursor, delta),
            SeekFrom::End(delta) => (self.modifier.size(), delta),
        };
        self.cursor = base
            .checked_add_signed(delta)
            .ok_or(FileError::InvalidSeek(i128::from(base) + i128::from(delta)))?;
        Ok(self.cursor)
    }

    /// Commit pending edits as the file's new root.
    ///
    /// Read-only descriptors have nothing to commit. With `full_sync` the
    /// parent has recorded the new root when this returns; otherwise the
    /// notification is delivered at close. If materializing fails the
    /// file's root is left as it was.
    pub fn flush(&mut self) -> FileResult<()> {
        self.ensure_open()?;
        if !self.mode.is_writable() {
            return Ok(());
        }

        let node = self.modifier.flush()?;
        self.file.store_node(node.clone());

        if self.full_sync {
            self.pending = None;
            if let Err(e) = self.file.notify_parent(&node) {
                self.pending = Some(node);
                return Err(e);
            }
        } else {
            self.pending = Some(node);
        }
        Ok(())
    }

    /// Deliver any deferred notification and release the access lock.
    ///
    /// Unflushed edits are discarded. A second call fails with
    /// [`FileError::DescriptorClosed`] and releases nothing.
    pub fn close(&mut self) -> FileResult<()> {
        let access = self.access.take().ok_or(FileError::DescriptorClosed)?;

        if self.modifier.has_changes() {
            warn!(file = %self.file.name(), "closing descriptor with unflushed changes");
        }
        let notified = match self.pending.take() {
            Some(node) => self.file.notify_parent(&node),
            None => Ok(()),
        };

        drop(access);
        debug!(file = %self.file.name(), mode = %self.mode, "closed descriptor");
        notified
    }
}

impl Drop for FileDescriptor {
    fn drop(&mut self) {
        if self.is_closed() {
            return;
        }
        if let Err(e) = self.close() {
            warn!(file = %self.file.name(), error = %e, "failed to close dropped descriptor");
        }
    }
}

impl std::fmt::Debug for FileDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDescriptor")
            .field("file", &self.file.name())
            .field("mode", &self.mode)
            .field("full_sync", &self.full_sync)
            .field("cursor", &self.cursor)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl io::Read for FileDescriptor {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(FileDescriptor::read(self, buf)?)
    }
}

impl io::Write for FileDescriptor {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(FileDescriptor::write(self, buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(FileDescriptor::flush(self)?)
    }
}

impl io::Seek for FileDescriptor {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Ok(FileDescriptor::seek(self, pos)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parent::{Namespace, ParentCloser};
    use crate::testing::{fixture, import, small_config};
    use mfs_modifier::{ModifierConfig, ModifierError};
    use mfs_store::InMemoryNodeStore;
    use mfs_types::AddressVersion;
    use std::io::{Read as _, Seek as _, Write as _};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Weak;

    #[test]
    fn second_close_is_an_error() {
        let fx = fixture(b"abc", AddressVersion::V1);
        let mut fd = fx.file.open(OpenMode::ReadWrite, false).unwrap();
        assert!(!fd.is_closed());
        fd.close().unwrap();
        assert!(fd.is_closed());
        assert!(matches!(fd.close(), Err(FileError::DescriptorClosed)));

        let mut next = fx.file.try_open(OpenMode::WriteOnly, false).unwrap().expect("lock free");
        next.close().unwrap();
    }

    #[test]
    fn operations_after_close_fail() {
        let fx = fixture(b"abc", AddressVersion::V1);
        let mut fd = fx.file.open(OpenMode::ReadWrite, false).unwrap();
        fd.close().unwrap();

        let mut buf = [0u8; 3];
        assert!(matches!(fd.read_at(0, &mut buf), Err(FileError::DescriptorClosed)));
        assert!(matches!(fd.write_at(0, b"x"), Err(FileError::DescriptorClosed)));
        assert!(matches!(fd.truncate(0), Err(FileError::DescriptorClosed)));
        assert!(matches!(fd.size(), Err(FileError::DescriptorClosed)));
        assert!(matches!(fd.flush(), Err(FileError::DescriptorClosed)));
        assert!(matches!(fd.seek(SeekFrom::Start(0)), Err(FileError::DescriptorClosed)));
    }

    #[test]
    fn read_only_denies_writes() {
        let fx = fixture(b"keep", AddressVersion::V0);
        let mut fd = fx.file.open(OpenMode::ReadOnly, true).unwrap();
        for err in [
            fd.write_at(0, b"x").unwrap_err(),
            fd.write(b"x").unwrap_err(),
            fd.truncate(0).unwrap_err(),
        ] {
            assert!(matches!(err, FileError::PermissionDenied { mode: OpenMode::ReadOnly, .. }));
        }
        fd.flush().unwrap();
        fd.close().unwrap();
        assert_eq!(fx.file.size().unwrap(), 4);
        assert_eq!(fx.parent.notifications(), 0);
    }

    #[test]
    fn write_only_denies_reads() {
        let fx = fixture(b"secret", AddressVersion::V1);
        let mut fd = fx.file.open(OpenMode::WriteOnly, false).unwrap();
        let mut buf = [0u8; 6];
        let err = fd.read(&mut buf).unwrap_err();
        assert!(matches!(err, FileError::PermissionDenied { op: "read", .. }));
        let io_err = io::Error::from(err);
        assert_eq!(io_err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn close_does_not_flush() {
        let fx = fixture(b"abc", AddressVersion::V1);
        let before = fx.file.node_id();
        let mut fd = fx.file.open(OpenMode::WriteOnly, false).unwrap();
        fd.write_at(3, b"def").unwrap();
        fd.close().unwrap();
        assert_eq!(fx.file.node_id(), before);
        assert_eq!(fx.file.size().unwrap(), 3);
        assert!(fx.parent.is_empty());
    }

    #[test]
    fn drop_releases_lock_and_delivers_pending() {
        let fx = fixture(b"", AddressVersion::V1);
        {
            let mut fd = fx.file.open(OpenMode::WriteOnly, false).unwrap();
            fd.write(b"dropped").unwrap();
            fd.flush().unwrap();
        }
        assert_eq!(fx.parent.entry("data.bin"), Some(fx.file.node_id()));
        assert!(fx.file.try_open(OpenMode::WriteOnly, false).unwrap().is_some());
    }

    #[test]
    fn reads_see_own_edits_then_commit() {
        let fx = fixture(b"old", AddressVersion::V1);
        let mut writer = fx.file.open(OpenMode::ReadWrite, false).unwrap();
        writer.write_at(0, b"new").unwrap();
        let mut buf = [0u8; 3];
        writer.read_at(0, &mut buf).unwrap();
        assert_eq!(&buf, b"new");
        writer.flush().unwrap();
        writer.close().unwrap();

        let reader = fx.file.open(OpenMode::ReadOnly, false).unwrap();
        reader.read_at(0, &mut buf).unwrap();
        assert_eq!(&buf, b"new");
    }

    #[test]
    fn seek_moves_cursor() {
        let fx = fixture(b"0123456789", AddressVersion::V1);
        let mut fd = fx.file.open(OpenMode::ReadWrite, false).unwrap();
        assert_eq!(fd.seek(SeekFrom::End(-3)).unwrap(), 7);
        let mut buf = [0u8; 8];
        assert_eq!(fd.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"789");
        assert_eq!(fd.position(), 10);

        assert_eq!(fd.seek(SeekFrom::Current(-10)).unwrap(), 0);
        assert!(matches!(fd.seek(SeekFrom::Current(-1)), Err(FileError::InvalidSeek(-1))));
        assert_eq!(fd.position(), 0);

        fd.seek(SeekFrom::Start(12)).unwrap();
        fd.write(b"!").unwrap();
        assert_eq!(fd.size().unwrap(), 13);
        let mut all = [0u8; 13];
        fd.read_at(0, &mut all).unwrap();
        assert_eq!(&all, b"0123456789\0\0!");
    }

    #[test]
    fn truncate_then_flush() {
        let fx = fixture(b"truncate me", AddressVersion::V0);
        let mut fd = fx.file.open(OpenMode::ReadWrite, true).unwrap();
        fd.truncate(8).unwrap();
        fd.flush().unwrap();
        fd.close().unwrap();
        assert_eq!(fx.file.size().unwrap(), 8);
        assert_eq!(fx.parent.entry("data.bin"), Some(fx.file.node_id()));
    }

    #[test]
    fn write_past_largest_offset_fails_cleanly() {
        let fx = fixture(b"abc", AddressVersion::V1);
        let mut fd = fx.file.open(OpenMode::ReadWrite, true).unwrap();
        assert_eq!(fd.seek(SeekFrom::Start(u64::MAX - 1)).unwrap(), u64::MAX - 1);
        let err = fd.write(b"hello").unwrap_err();
        assert!(matches!(
            err,
            FileError::Modifier(ModifierError::OffsetOverflow { len: 5, .. })
        ));
        assert_eq!(fd.position(), u64::MAX - 1);
        assert_eq!(fd.size().unwrap(), 3);

        let io_err = io::Write::write(&mut fd, b"hello").unwrap_err();
        assert_eq!(io_err.kind(), io::ErrorKind::InvalidInput);

        fd.flush().unwrap();
        fd.close().unwrap();
        assert_eq!(fx.file.size().unwrap(), 3);
    }

    #[test]
    fn sparse_truncate_flushes_at_full_size() {
        let store = Arc::new(InMemoryNodeStore::new());
        let root = import(&store, b"abc", AddressVersion::V1);
        let parent = Arc::new(Namespace::new());
        let weak = Arc::downgrade(&parent) as Weak<dyn ParentCloser>;
        let config = ModifierConfig {
            chunk_size: 1 << 20,
            max_links: 174,
        };
        let file = File::with_config("sparse.bin", root, weak, store.clone(), config).unwrap();

        let mut fd = file.open(OpenMode::ReadWrite, true).unwrap();
        fd.truncate(4 << 30).unwrap();
        fd.flush().unwrap();
        fd.close().unwrap();

        assert_eq!(file.size().unwrap(), 4 << 30);
        assert_eq!(parent.entry("sparse.bin"), Some(file.node_id()));
        let fd = file.open(OpenMode::ReadOnly, false).unwrap();
        let mut head = [0u8; 3];
        fd.read_at(0, &mut head).unwrap();
        assert_eq!(&head, b"abc");
        let mut tail = [1u8; 16];
        assert_eq!(fd.read_at((4 << 30) - 16, &mut tail).unwrap(), 16);
        assert_eq!(tail, [0u8; 16]);
        assert!(store.total_bytes() < 4 << 20);
    }

    #[test]
    fn std_io_traits() {
        let fx = fixture(b"", AddressVersion::V1);
        let mut fd = fx.file.open(OpenMode::ReadWrite, false).unwrap();
        fd.write_all(b"hello, world").unwrap();
        io::Write::flush(&mut fd).unwrap();
        fd.rewind().unwrap();
        let mut out = String::new();
        fd.read_to_string(&mut out).unwrap();
        assert_eq!(out, "hello, world");
        let err = io::Seek::seek(&mut fd, SeekFrom::End(-20)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        fd.close().unwrap();
        assert_eq!(fx.file.size().unwrap(), 12);
    }

    #[test]
    fn failed_materialize_keeps_previous_root() {
        let fx = fixture(b"0123456789", AddressVersion::V1);
        let before = fx.file.node_id();
        let mut fd = fx.file.open(OpenMode::ReadWrite, true).unwrap();
        // Re-chunking the dirty span reads the old leaf back.
        let first_leaf = fx.file.get_node().unwrap().links()[0].id;
        fd.write_at(1, b"x").unwrap();
        mfs_store::NodeStore::remove(fx.store.as_ref(), &first_leaf).unwrap();

        assert!(fd.flush().is_err());
        assert_eq!(fx.file.node_id(), before);
        assert_eq!(fx.parent.notifications(), 0);
        fd.close().unwrap();
    }

    #[test]
    fn failed_full_sync_notification_is_retried_at_close() {
        let store = Arc::new(InMemoryNodeStore::new());
        let root = import(&store, b"abc", AddressVersion::V1);
        let calls = Arc::new(AtomicUsize::new(0));
        let parent: Arc<dyn ParentCloser> = {
            let calls = Arc::clone(&calls);
            Arc::new(move |name: &str, _: &Node| -> FileResult<()> {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    return Err(FileError::Parent {
                        name: name.to_string(),
                        reason: "busy".into(),
                    });
                }
                Ok(())
            })
        };
        let file = File::with_config("f", root, Arc::downgrade(&parent), store, small_config()).unwrap();

        let mut fd = file.open(OpenMode::WriteOnly, true).unwrap();
        fd.write_at(0, b"xyz").unwrap();
        assert!(matches!(fd.flush(), Err(FileError::Parent { .. })));
        assert_eq!(file.size().unwrap(), 3);
        fd.close().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
