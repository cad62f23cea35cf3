//! The annotation overlay: segments, data types, labels, and comments,
//! indexed by target address and queryable both randomly and as a
//! single-pass stream.

mod label;

pub use label::{Label, branch_label_name};

use crate::error::AnnotationErrorKind;
use crate::literal::hex16;
use rangemap::{RangeInclusiveMap, RangeInclusiveSet};
use std::collections::HashMap;
use std::fmt::Write;

//===========================================================================//

/// One past the highest target address.
pub const ADDRESS_LIMIT: u32 = 0x1_0000;

/// Sentinel meaning "no further entry" in the cursor's lookahead.
const NO_MORE: u32 = u32::MAX;

//===========================================================================//

/// How the bytes of a region are to be interpreted.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DataType {
    /// No explicit type: inherit from the enclosing segment, or fall back
    /// to `Code`.
    Undefined,
    /// Executable instructions.
    Code,
    /// Raw data bytes.
    Bytes,
    /// 16-bit words, most significant byte first.
    WordsBE,
    /// 16-bit words, least significant byte first.
    WordsLE,
    /// Character data.
    Text,
    /// A table of 16-bit return vectors (little-endian pointers).
    RetTable,
}

impl DataType {
    /// The annotation-file keyword for this type, if it has one.
    fn keyword(self) -> Option<&'static str> {
        match self {
            DataType::Undefined => None,
            DataType::Code => Some("code"),
            DataType::Bytes => Some("bytes"),
            DataType::WordsBE => Some("dwords_be"),
            DataType::WordsLE => Some("dwords_le"),
            DataType::Text => Some("text"),
            DataType::RetTable => Some("ret"),
        }
    }
}

//===========================================================================//

/// A named, non-overlapping address range with a default data type.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Segment {
    /// The segment's name, as shown in listing banners.
    pub name: String,
    /// The default data type for bytes inside the segment.
    pub data_type: DataType,
    /// The first address of the segment.
    pub start: u32,
    /// The last address of the segment (inclusive).
    pub end: u32,
}

/// A piece of text attached to a single address.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Comment {
    /// The comment text.
    pub text: String,
    /// The address the comment is attached to.
    pub address: u32,
}

//===========================================================================//

/// An address-indexed overlay describing, for every byte of the image,
/// which segment it belongs to, which data type governs it, which label
/// (if any) points at it, and whether a comment is attached.
///
/// The map is populated before scanning and queried read-only afterwards;
/// [`AnnotationMap::cursor`] yields a streaming view for the byte sweep,
/// while label and comment lookups stay random-access.
#[derive(Default)]
pub struct AnnotationMap {
    segments: Vec<Segment>,
    segment_extents: RangeInclusiveSet<u32>,
    data_types: RangeInclusiveMap<u32, DataType>,
    labels: Vec<Label>,
    label_index: HashMap<u32, usize>,
    comments: Vec<Comment>,
}

impl AnnotationMap {
    /// Constructs an empty annotation map (every address `Undefined`,
    /// no segments, labels, or comments).
    pub fn new() -> AnnotationMap {
        AnnotationMap::default()
    }

    //-----------------------------------------------------------------------
    // Segments

    /// Inserts a segment.  Fails with `OverlappingSegment` if the new
    /// range intersects any existing segment.
    pub fn add_segment(
        &mut self,
        name: &str,
        data_type: DataType,
        start: u32,
        end: u32,
    ) -> Result<(), AnnotationErrorKind> {
        debug_assert!(start <= end);
        if self.segment_extents.overlaps(&(start..=end)) {
            return Err(AnnotationErrorKind::OverlappingSegment(
                name.to_string(),
            ));
        }
        self.segment_extents.insert(start..=end);
        let index =
            self.segments.partition_point(|segment| segment.start < start);
        self.segments.insert(
            index,
            Segment { name: name.to_string(), data_type, start, end },
        );
        Ok(())
    }

    /// Returns true if a segment begins exactly at `address`.
    pub fn segment_starts_at(&self, address: u32) -> bool {
        self.segments
            .binary_search_by_key(&address, |segment| segment.start)
            .is_ok()
    }

    /// Returns the segment containing `address`, if any.
    pub fn segment_at(&self, address: u32) -> Option<&Segment> {
        let index = self
            .segments
            .partition_point(|segment| segment.start <= address);
        let segment = self.segments[..index].last()?;
        if address <= segment.end { Some(segment) } else { None }
    }

    /// All segments, in ascending address order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    //-----------------------------------------------------------------------
    // Data types

    /// Overrides the data type of the half-open range `[start, end)`.
    /// Setting `Undefined` clears the range back to the inherit state.
    pub fn set_data_type(&mut self, start: u32, end: u32, data_type: DataType) {
        if start >= end {
            return;
        }
        if data_type == DataType::Undefined {
            self.data_types.remove(start..=end - 1);
        } else {
            self.data_types.insert(start..=end - 1, data_type);
        }
    }

    /// The first data-type breakpoint strictly above `address`, or
    /// [`ADDRESS_LIMIT`] if there is none.  Typed labels stamp their type
    /// up to this boundary.
    fn next_breakpoint_after(&self, address: u32) -> u32 {
        for (range, _) in self.data_types.iter() {
            if *range.start() > address {
                return *range.start();
            }
            let after_end = range.end().saturating_add(1);
            if after_end > address {
                return after_end.min(ADDRESS_LIMIT);
            }
        }
        ADDRESS_LIMIT
    }

    /// The overlay as an ascending breakpoint list starting at address 0;
    /// breakpoint `i` covers addresses up to breakpoint `i + 1`.
    /// Consecutive breakpoints always carry different types.
    pub fn breakpoints(&self) -> Vec<(u32, DataType)> {
        let mut breakpoints = Vec::new();
        let mut next_start = 0u32;
        for (range, &data_type) in self.data_types.iter() {
            if *range.start() > next_start || breakpoints.is_empty() {
                if *range.start() > 0 {
                    breakpoints.push((next_start, DataType::Undefined));
                }
            }
            breakpoints.push((*range.start(), data_type));
            next_start = range.end().saturating_add(1);
        }
        if breakpoints.is_empty() {
            breakpoints.push((0, DataType::Undefined));
        } else if next_start < ADDRESS_LIMIT && next_start != 0 {
            breakpoints.push((next_start, DataType::Undefined));
        }
        breakpoints
    }

    /// The data type effective at `address`: the label's type when it has
    /// one, else the overlay, else the enclosing segment's default, else
    /// `Code`.
    pub fn effective_type_at(&self, address: u32) -> DataType {
        if let Some(label) = self.get_label(address) {
            let data_type = label.data_type();
            if data_type != DataType::Undefined {
                return data_type;
            }
        }
        if let Some(&data_type) = self.data_types.get(&address) {
            return data_type;
        }
        match self.segment_at(address) {
            Some(segment) if segment.data_type != DataType::Undefined => {
                segment.data_type
            }
            _ => DataType::Code,
        }
    }

    //-----------------------------------------------------------------------
    // Labels

    /// Adds a point label, replacing any existing label at that address.
    /// A label with a concrete data type stamps the overlay from its
    /// address up to the next existing breakpoint, so a typed label
    /// governs the run it opens.
    pub fn add_label(
        &mut self,
        name: &str,
        address: u32,
        data_type: DataType,
        jump_target: bool,
    ) {
        if data_type != DataType::Undefined {
            let end = self.next_breakpoint_after(address);
            self.set_data_type(address, end, data_type);
        }
        let index = self.labels.len();
        self.labels.push(Label::Point {
            name: name.to_string(),
            address,
            data_type,
            jump_target,
        });
        self.label_index.insert(address, index);
    }

    /// Adds a range label over `[start, end]`, replacing existing labels
    /// at every covered address.  The head is always a jump target.
    pub fn add_range_label(
        &mut self,
        name: &str,
        start: u32,
        end: u32,
        data_type: DataType,
        jump_target: bool,
    ) {
        debug_assert!(start <= end);
        if data_type != DataType::Undefined {
            self.set_data_type(start, end.saturating_add(1), data_type);
        }
        let index = self.labels.len();
        self.labels.push(Label::Range {
            name: name.to_string(),
            start,
            end,
            data_type,
            jump_target,
        });
        for address in start..=end {
            self.label_index.insert(address, index);
        }
    }

    /// Adds an indirect (pointer-table) label at `address` with the given
    /// record length, and marks the run it opens as a return-vector table.
    pub fn add_indirect_label(&mut self, name: &str, address: u32, offset: u32) {
        let end = self.next_breakpoint_after(address);
        self.set_data_type(address, end, DataType::RetTable);
        let index = self.labels.len();
        self.labels.push(Label::Indirect {
            name: name.to_string(),
            address,
            offset: offset.max(1),
        });
        self.label_index.insert(address, index);
    }

    /// Returns true if any label covers `address`.
    pub fn label_at(&self, address: u32) -> bool {
        self.label_index.contains_key(&address)
    }

    /// Returns the label covering `address`, if any.
    pub fn get_label(&self, address: u32) -> Option<&Label> {
        self.label_index.get(&address).map(|&index| &self.labels[index])
    }

    /// Returns true if a jump-target label heads a line at `address`.
    pub fn jump_target_at(&self, address: u32) -> bool {
        match self.get_label(address) {
            Some(label) => {
                label.is_jump_target(address)
                    && !label.jump_target_name(address).is_empty()
            }
            None => false,
        }
    }

    //-----------------------------------------------------------------------
    // Comments

    /// Attaches a comment to `address`, replacing any existing one there.
    pub fn add_comment(&mut self, text: &str, address: u32) {
        let comment = Comment { text: text.to_string(), address };
        match self
            .comments
            .binary_search_by_key(&address, |comment| comment.address)
        {
            Ok(index) => self.comments[index] = comment,
            Err(index) => self.comments.insert(index, comment),
        }
    }

    /// Returns the comment attached to `address`, if any.
    pub fn comment_at(&self, address: u32) -> Option<&Comment> {
        self.comments
            .binary_search_by_key(&address, |comment| comment.address)
            .ok()
            .map(|index| &self.comments[index])
    }

    //-----------------------------------------------------------------------
    // Streaming

    /// Returns a streaming cursor positioned at `base_address`.  Cursor
    /// answers are a pure function of the current address and the map
    /// contents, so separate sweeps over the same map agree.
    pub fn cursor(&self, base_address: u32) -> Cursor<'_> {
        Cursor::new(self, base_address)
    }

    //-----------------------------------------------------------------------
    // Canonical form

    /// Re-emits the map as annotation-file text.  Parsing the canonical
    /// form reproduces the map (indirect labels have no file syntax and
    /// are omitted).
    pub fn canonical(&self) -> String {
        let mut out = String::new();
        if !self.segments.is_empty() {
            out.push_str("segments:\n");
            for segment in &self.segments {
                write!(out, "${}..${}", hex16(segment.start), hex16(segment.end))
                    .unwrap();
                if segment.data_type != DataType::Code {
                    if let Some(keyword) = segment.data_type.keyword() {
                        write!(out, " {}", keyword).unwrap();
                    }
                }
                writeln!(out, " {}", segment.name).unwrap();
            }
        }
        let mut label_addresses: Vec<u32> =
            self.label_index.keys().copied().collect();
        label_addresses.sort_unstable();
        let mut wrote_header = false;
        for address in label_addresses {
            let label = &self.labels[self.label_index[&address]];
            let entry = match label {
                Label::Point { name, address, data_type, .. } => {
                    let mut entry = format!("${}", hex16(*address));
                    if let Some(keyword) = data_type.keyword() {
                        write!(entry, " {}", keyword).unwrap();
                    }
                    write!(entry, " {}", name).unwrap();
                    entry
                }
                Label::Range { name, start, end, data_type, .. } => {
                    if address != *start {
                        continue; // emitted at the head only
                    }
                    let mut entry =
                        format!("${}..${}", hex16(*start), hex16(*end));
                    if let Some(keyword) = data_type.keyword() {
                        write!(entry, " {}", keyword).unwrap();
                    }
                    write!(entry, " {}", name).unwrap();
                    entry
                }
                Label::Indirect { .. } => continue,
            };
            if !wrote_header {
                out.push_str("labels:\n");
                wrote_header = true;
            }
            out.push_str(&entry);
            out.push('\n');
        }
        if !self.comments.is_empty() {
            out.push_str("comments:\n");
            for comment in &self.comments {
                let escaped = comment
                    .text
                    .replace('\\', "\\\\")
                    .replace('"', "\\\"");
                writeln!(
                    out,
                    "${} \"{}\"",
                    hex16(comment.address),
                    escaped
                )
                .unwrap();
            }
        }
        out
    }
}

//===========================================================================//

/// A single-pass view of an [`AnnotationMap`], advanced one address at a
/// time by the disassembly sweep.  The next boundary of each category is
/// precomputed so that advancing is O(1) per byte.
pub struct Cursor<'a> {
    map: &'a AnnotationMap,
    breakpoints: Vec<(u32, DataType)>,
    address: u32,
    segment_index: usize,
    next_segment_start: u32,
    data_type_index: usize,
    next_data_type_start: u32,
    comment_index: usize,
    next_comment: u32,
}

impl<'a> Cursor<'a> {
    fn new(map: &'a AnnotationMap, base_address: u32) -> Cursor<'a> {
        let breakpoints = map.breakpoints();
        let segment_index = map
            .segments
            .partition_point(|segment| segment.start <= base_address)
            .saturating_sub(1);
        let next_segment_start = map
            .segments
            .get(segment_index + 1)
            .map_or(NO_MORE, |segment| segment.start);
        let data_type_index = breakpoints
            .partition_point(|&(start, _)| start <= base_address)
            .saturating_sub(1);
        let next_data_type_start = breakpoints
            .get(data_type_index + 1)
            .map_or(NO_MORE, |&(start, _)| start);
        let comment_index = map
            .comments
            .partition_point(|comment| comment.address < base_address);
        let next_comment = map
            .comments
            .get(comment_index + 1)
            .map_or(NO_MORE, |comment| comment.address);
        Cursor {
            map,
            breakpoints,
            address: base_address,
            segment_index,
            next_segment_start,
            data_type_index,
            next_data_type_start,
            comment_index,
            next_comment,
        }
    }

    /// The address the cursor is currently standing on.
    pub fn address(&self) -> u32 {
        self.address
    }

    /// Moves to the next address, updating whichever lookahead boundaries
    /// were crossed.
    pub fn advance(&mut self) {
        self.address += 1;
        if self.address >= self.next_segment_start {
            self.segment_index += 1;
            self.next_segment_start = self
                .map
                .segments
                .get(self.segment_index + 1)
                .map_or(NO_MORE, |segment| segment.start);
        }
        // The final breakpoint extends to the end of the image, so the
        // data-type index never advances past it.
        if self.address >= self.next_data_type_start
            && self.data_type_index + 1 < self.breakpoints.len()
        {
            self.data_type_index += 1;
            self.next_data_type_start = self
                .breakpoints
                .get(self.data_type_index + 1)
                .map_or(NO_MORE, |&(start, _)| start);
        }
        if self.address >= self.next_comment {
            self.comment_index += 1;
            self.next_comment = self
                .map
                .comments
                .get(self.comment_index + 1)
                .map_or(NO_MORE, |comment| comment.address);
        }
    }

    /// The data type at the current address: the label's type when it has
    /// one, else the overlay, else the enclosing segment's default, else
    /// `Code`.
    pub fn data_type(&self) -> DataType {
        if let Some(label) = self.map.get_label(self.address) {
            let data_type = label.data_type();
            if data_type != DataType::Undefined {
                return data_type;
            }
        }
        let overlay = self.breakpoints[self.data_type_index].1;
        if overlay != DataType::Undefined {
            return overlay;
        }
        match self.segment() {
            Some(segment) if segment.data_type != DataType::Undefined => {
                segment.data_type
            }
            _ => DataType::Code,
        }
    }

    /// Returns true if a segment begins at the current address.
    pub fn is_segment_start(&self) -> bool {
        match self.map.segments.get(self.segment_index) {
            Some(segment) => self.address == segment.start,
            None => false,
        }
    }

    /// Returns true if a segment ends at the current address.
    pub fn is_segment_end(&self) -> bool {
        match self.map.segments.get(self.segment_index) {
            Some(segment) => self.address == segment.end,
            None => false,
        }
    }

    /// The segment containing the current address, if any.
    pub fn segment(&self) -> Option<&'a Segment> {
        let segment = self.map.segments.get(self.segment_index)?;
        if self.address >= segment.start && self.address <= segment.end {
            Some(segment)
        } else {
            None
        }
    }

    /// Returns true if a comment is attached to the current address.
    pub fn has_comment(&self) -> bool {
        match self.map.comments.get(self.comment_index) {
            Some(comment) => self.address == comment.address,
            None => false,
        }
    }

    /// The comment at the current address, if any.
    pub fn comment(&self) -> Option<&'a Comment> {
        if self.has_comment() {
            self.map.comments.get(self.comment_index)
        } else {
            None
        }
    }
}

//===========================================================================//


//===========================================================================//
