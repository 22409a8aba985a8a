//! Piece catalog for a single media file inside a swarm transfer.
//!
//! The catalog is built once per playback session and never restructured:
//! the transfer engine owns every piece's completion state and flips it as
//! downloads finish, while the scheduler only reads states and byte ranges.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Zero-based index of a piece within the catalog.
///
/// Matches the transfer engine's piece numbering, so indices can be handed
/// to the priority sink without translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PieceIndex(pub u32);

impl PieceIndex {
    /// Creates PieceIndex from zero-based index.
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the underlying piece index as u32.
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PieceIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Completion state of a piece, owned and mutated by the transfer engine.
///
/// The scheduler never writes states; it only reads them to decide which
/// pieces still need priority.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PieceState {
    /// Piece is known and can be requested.
    Ready = 0,
    /// Piece has an in-flight request in the transfer engine.
    Downloading = 1,
    /// Piece is fully downloaded and verified.
    Finished = 2,
    /// Last download attempt failed; the piece can be re-requested.
    Failed = 3,
    /// No connected peer currently advertises this piece.
    NotAvailable = 4,
}

impl PieceState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => PieceState::Ready,
            1 => PieceState::Downloading,
            2 => PieceState::Finished,
            3 => PieceState::Failed,
            _ => PieceState::NotAvailable,
        }
    }
}

/// One fixed-size (except possibly the last) chunk of the underlying file.
///
/// Byte offsets are absolute within the transfer, so a file that does not
/// start at offset zero keeps its real layout. The state lives in an atomic
/// cell: the engine stores, the scheduler loads, no lock required.
#[derive(Debug)]
pub struct Piece {
    index: PieceIndex,
    bytes_start: u64,
    bytes_end: u64,
    state: AtomicU8,
}

impl Piece {
    /// Creates a piece covering `size` bytes starting at `bytes_start`,
    /// initially in the `Ready` state.
    pub fn new(index: PieceIndex, bytes_start: u64, size: u64) -> Self {
        Self {
            index,
            bytes_start,
            bytes_end: bytes_start + size,
            state: AtomicU8::new(PieceState::Ready as u8),
        }
    }

    /// Ordinal position in the catalog.
    pub fn index(&self) -> PieceIndex {
        self.index
    }

    /// First byte covered by this piece (absolute offset).
    pub fn bytes_start(&self) -> u64 {
        self.bytes_start
    }

    /// One past the last byte covered by this piece (absolute offset).
    pub fn bytes_end(&self) -> u64 {
        self.bytes_end
    }

    /// Byte length of this piece.
    pub fn size(&self) -> u64 {
        self.bytes_end - self.bytes_start
    }

    /// Current completion state as last written by the transfer engine.
    pub fn state(&self) -> PieceState {
        PieceState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Records a state transition. Called by the transfer engine only.
    pub fn set_state(&self, state: PieceState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Whether this piece covers the given absolute byte offset.
    pub fn contains(&self, offset: u64) -> bool {
        offset >= self.bytes_start && offset < self.bytes_end
    }
}

/// Errors raised while building a piece catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("piece at position {position} has index {actual}, expected {expected}")]
    NonContiguousIndex {
        position: usize,
        expected: u32,
        actual: u32,
    },

    #[error("piece {index} starts at byte {actual}, expected {expected}")]
    NonContiguousBytes { index: u32, expected: u64, actual: u64 },

    #[error("piece {index} covers an empty byte range")]
    EmptyPiece { index: u32 },

    #[error("playback offset {offset} outside file range {start}..{end}")]
    OffsetOutsideFile { offset: u64, start: u64, end: u64 },
}

/// Ordered, index-dense sequence of pieces covering one media file.
///
/// Derived values (total size, first/last index, initial piece for the
/// requested playback offset) are computed once at construction and fixed
/// for the catalog's lifetime. An empty catalog is legal and degrades every
/// scheduler operation to a no-op.
#[derive(Debug)]
pub struct PieceCatalog {
    pieces: Vec<Piece>,
    total_size: u64,
    initial_index: Option<PieceIndex>,
}

impl PieceCatalog {
    /// Builds a catalog from pieces sorted by index, validating that indices
    /// are dense from zero and byte ranges tile the file without gaps.
    ///
    /// `playback_offset` is the absolute byte position playback starts at;
    /// the piece covering it becomes the catalog's initial piece.
    ///
    /// # Errors
    ///
    /// - `CatalogError::NonContiguousIndex` - Piece indices are not dense from 0
    /// - `CatalogError::NonContiguousBytes` - Byte ranges leave a gap or overlap
    /// - `CatalogError::EmptyPiece` - A piece covers zero bytes
    /// - `CatalogError::OffsetOutsideFile` - Playback offset outside the file
    pub fn new(pieces: Vec<Piece>, playback_offset: u64) -> Result<Self, CatalogError> {
        let mut expected_start = None;
        for (position, piece) in pieces.iter().enumerate() {
            if piece.index.as_u32() as usize != position {
                return Err(CatalogError::NonContiguousIndex {
                    position,
                    expected: position as u32,
                    actual: piece.index.as_u32(),
                });
            }
            if piece.size() == 0 {
                return Err(CatalogError::EmptyPiece {
                    index: piece.index.as_u32(),
                });
            }
            if let Some(expected) = expected_start
                && piece.bytes_start != expected
            {
                return Err(CatalogError::NonContiguousBytes {
                    index: piece.index.as_u32(),
                    expected,
                    actual: piece.bytes_start,
                });
            }
            expected_start = Some(piece.bytes_end);
        }

        let initial_index = if pieces.is_empty() {
            None
        } else {
            let found = pieces
                .iter()
                .find(|piece| piece.contains(playback_offset))
                .map(Piece::index);
            match found {
                Some(index) => Some(index),
                None => {
                    return Err(CatalogError::OffsetOutsideFile {
                        offset: playback_offset,
                        start: pieces[0].bytes_start,
                        end: pieces[pieces.len() - 1].bytes_end,
                    });
                }
            }
        };

        let total_size = pieces.iter().map(Piece::size).sum();

        Ok(Self {
            pieces,
            total_size,
            initial_index,
        })
    }

    /// Number of pieces in the catalog.
    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    /// Whether the catalog holds no pieces.
    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Looks up a piece by index.
    pub fn piece(&self, index: PieceIndex) -> Option<&Piece> {
        self.pieces.get(index.as_u32() as usize)
    }

    /// All pieces in index order.
    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    /// Total byte size covered by the catalog.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Absolute offset one past the file's last byte, or 0 when empty.
    pub fn end_offset(&self) -> u64 {
        self.pieces.last().map_or(0, Piece::bytes_end)
    }

    /// Index of the first piece, `None` when the catalog is empty.
    pub fn first_index(&self) -> Option<PieceIndex> {
        self.pieces.first().map(Piece::index)
    }

    /// Index of the last piece, `None` when the catalog is empty.
    pub fn last_index(&self) -> Option<PieceIndex> {
        self.pieces.last().map(Piece::index)
    }

    /// Piece covering the requested playback start offset.
    pub fn initial_index(&self) -> Option<PieceIndex> {
        self.initial_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pieces(count: u32, piece_size: u64) -> Vec<Piece> {
        (0..count)
            .map(|i| Piece::new(PieceIndex::new(i), i as u64 * piece_size, piece_size))
            .collect()
    }

    #[test]
    fn test_catalog_derived_values() {
        let catalog = PieceCatalog::new(pieces(10, 32768), 5 * 32768).unwrap();

        assert_eq!(catalog.len(), 10);
        assert_eq!(catalog.total_size(), 10 * 32768);
        assert_eq!(catalog.first_index(), Some(PieceIndex::new(0)));
        assert_eq!(catalog.last_index(), Some(PieceIndex::new(9)));
        assert_eq!(catalog.initial_index(), Some(PieceIndex::new(5)));
        assert_eq!(catalog.end_offset(), 10 * 32768);
    }

    #[test]
    fn test_initial_piece_covers_mid_piece_offset() {
        let catalog = PieceCatalog::new(pieces(4, 1024), 1500).unwrap();
        assert_eq!(catalog.initial_index(), Some(PieceIndex::new(1)));
    }

    #[test]
    fn test_empty_catalog_is_legal() {
        let catalog = PieceCatalog::new(Vec::new(), 0).unwrap();

        assert!(catalog.is_empty());
        assert_eq!(catalog.total_size(), 0);
        assert_eq!(catalog.first_index(), None);
        assert_eq!(catalog.last_index(), None);
        assert_eq!(catalog.initial_index(), None);
    }

    #[test]
    fn test_nonzero_file_start_offset() {
        let list = vec![
            Piece::new(PieceIndex::new(0), 4096, 1024),
            Piece::new(PieceIndex::new(1), 5120, 1024),
        ];
        let catalog = PieceCatalog::new(list, 5200).unwrap();

        assert_eq!(catalog.initial_index(), Some(PieceIndex::new(1)));
        assert_eq!(catalog.end_offset(), 6144);
    }

    #[test]
    fn test_rejects_sparse_indices() {
        let list = vec![
            Piece::new(PieceIndex::new(0), 0, 1024),
            Piece::new(PieceIndex::new(2), 1024, 1024),
        ];
        let result = PieceCatalog::new(list, 0);
        assert!(matches!(
            result,
            Err(CatalogError::NonContiguousIndex { position: 1, .. })
        ));
    }

    #[test]
    fn test_rejects_byte_gap() {
        let list = vec![
            Piece::new(PieceIndex::new(0), 0, 1024),
            Piece::new(PieceIndex::new(1), 2048, 1024),
        ];
        let result = PieceCatalog::new(list, 0);
        assert!(matches!(
            result,
            Err(CatalogError::NonContiguousBytes { index: 1, .. })
        ));
    }

    #[test]
    fn test_rejects_offset_past_end() {
        let result = PieceCatalog::new(pieces(2, 1024), 2048);
        assert!(matches!(result, Err(CatalogError::OffsetOutsideFile { .. })));
    }

    #[test]
    fn test_state_cell_round_trip() {
        let piece = Piece::new(PieceIndex::new(0), 0, 1024);
        assert_eq!(piece.state(), PieceState::Ready);

        piece.set_state(PieceState::Downloading);
        assert_eq!(piece.state(), PieceState::Downloading);

        piece.set_state(PieceState::Finished);
        assert_eq!(piece.state(), PieceState::Finished);
    }
}
