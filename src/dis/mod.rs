//! The two-pass disassembly scanner and the top-level driver.

use crate::annot::{AnnotationMap, Cursor, DataType, Label, branch_label_name};
use crate::config::Config;
use crate::inst::{
    DATA_BYTE, DATA_RET, DATA_TEXT, DATA_WORD, Instruction, InstructionTable,
};
use crate::listing::ListingWriter;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::collections::HashMap;

//===========================================================================//

/// A single output line: an address, an instruction descriptor, and the
/// operand value (whose interpretation depends on the descriptor).
#[derive(Clone, Copy, Debug)]
pub struct AssemblyLine {
    /// The target address of the line's first byte.
    pub address: u32,
    /// The instruction (or pseudo-instruction) on this line.
    pub instruction: &'static Instruction,
    /// The operand value, if the instruction takes one.
    pub operand: u16,
}

impl AssemblyLine {
    /// The number of image bytes this line accounts for.
    pub fn byte_len(&self) -> u32 {
        if self.instruction.is_data() {
            self.instruction.operand_length
        } else {
            1 + self.instruction.operand_length
        }
    }
}

//===========================================================================//

/// The interrupt and restart vectors of the 8085.  Installed on request,
/// overriding any user label at the same address.
const INTERRUPT_VECTORS: [(&str, u32); 12] = [
    ("rst0", 0x00),
    ("rst1", 0x08),
    ("rst2", 0x10),
    ("rst3", 0x18),
    ("rst4", 0x20),
    ("trap", 0x24),
    ("rst5", 0x28),
    ("rst55", 0x2c),
    ("rst6", 0x30),
    ("rst65", 0x34),
    ("rst7", 0x38),
    ("rst75", 0x3c),
];

/// Installs the 8085 interrupt-vector labels, replacing user labels at
/// the same addresses.
pub fn add_interrupt_labels(info: &mut AnnotationMap) {
    for (name, address) in INTERRUPT_VECTORS {
        info.add_label(name, address, DataType::Code, true);
    }
}

//===========================================================================//

/// Disassembles the image into listing text.  Runs both scanner passes,
/// merges the discovered branch labels into the map, and renders the
/// final line list.
pub fn disassemble(
    config: &Config,
    image: &[u8],
    info: &mut AnnotationMap,
) -> String {
    if config.hw_labels {
        add_interrupt_labels(info);
    }
    let lines = scan(config, image, info);
    ListingWriter::new(config, info).write(&lines)
}

/// Runs the two-pass sweep over the image.  Pass 1 exists only to collect
/// branch-target labels, so that pass 2 already knows every label when
/// deciding where instructions must be split; its line list is discarded.
/// After pass 2, the auto labels are merged into the map (only for
/// addresses not already labeled).
pub fn scan(
    config: &Config,
    image: &[u8],
    info: &mut AnnotationMap,
) -> Vec<AssemblyLine> {
    let table = InstructionTable::i8085();
    let no_labels = HashMap::new();
    let mut first = Pass::new(config, image, info, table, &no_labels);
    first.run();
    let first_labels = first.auto_labels;
    let mut second = Pass::new(config, image, info, table, &first_labels);
    let lines = second.run();
    let final_labels = second.auto_labels;
    for (address, name) in final_labels {
        if !info.label_at(address) {
            info.add_label(&name, address, DataType::Undefined, true);
        }
    }
    lines
}

//===========================================================================//

struct Pass<'a> {
    config: &'a Config,
    image: &'a [u8],
    info: &'a AnnotationMap,
    table: InstructionTable,
    cursor: Cursor<'a>,
    previous_labels: &'a HashMap<u32, String>,
    auto_labels: HashMap<u32, String>,
    lines: Vec<AssemblyLine>,
    offset: u32,
    ret_run_start: Option<u32>,
}

impl<'a> Pass<'a> {
    fn new(
        config: &'a Config,
        image: &'a [u8],
        info: &'a AnnotationMap,
        table: InstructionTable,
        previous_labels: &'a HashMap<u32, String>,
    ) -> Pass<'a> {
        Pass {
            config,
            image,
            info,
            table,
            cursor: info.cursor(config.base_address),
            previous_labels,
            auto_labels: HashMap::new(),
            lines: Vec::new(),
            offset: config.start_offset,
            ret_run_start: None,
        }
    }

    fn run(&mut self) -> Vec<AssemblyLine> {
        let file_end = (self.image.len() as u32).saturating_sub(1);
        let last_offset = self.config.end_offset.min(file_end);
        if self.image.is_empty() {
            return Vec::new();
        }
        while self.offset <= last_offset {
            let data_type = self.cursor.data_type();
            if data_type == DataType::RetTable {
                if self.ret_run_start.is_none() {
                    self.ret_run_start = Some(self.cursor.address());
                }
            } else {
                self.ret_run_start = None;
            }
            match data_type {
                DataType::Code | DataType::Undefined => {
                    self.read_instruction();
                }
                DataType::Bytes => {
                    let byte = self.byte_at(self.offset);
                    self.push_data(DATA_BYTE, u16::from(byte));
                }
                DataType::Text => {
                    let byte = self.byte_at(self.offset);
                    self.push_data(DATA_TEXT, u16::from(byte));
                }
                DataType::WordsLE => self.read_word(DataType::WordsLE),
                DataType::WordsBE => self.read_word(DataType::WordsBE),
                DataType::RetTable => self.read_ret_entry(last_offset),
            }
        }
        std::mem::take(&mut self.lines)
    }

    /// The byte at a file offset; bytes past the end of the image read as
    /// zero.
    fn byte_at(&self, offset: u32) -> u8 {
        self.image.get(offset as usize).copied().unwrap_or(0)
    }

    fn advance(&mut self, count: u32) {
        for _ in 0..count {
            self.offset += 1;
            self.cursor.advance();
        }
    }

    /// Emits a single data pseudo-instruction at the current address and
    /// steps past the bytes it covers.
    fn push_data(&mut self, opcode: u16, operand: u16) {
        let instruction = self.table.pseudo(opcode);
        let line = AssemblyLine {
            address: self.cursor.address(),
            instruction,
            operand,
        };
        self.advance(line.byte_len());
        self.lines.push(line);
    }

    /// A pending opcode may not consume the byte at `address` as an
    /// operand if the address is outside the configured range, a
    /// jump-target label points at it (user-defined or auto-generated in
    /// either pass), a segment starts there, or a comment is attached.
    fn can_read_as_operand(&self, address: u32) -> bool {
        let upper = self
            .config
            .end_offset
            .saturating_sub(self.config.start_offset)
            .saturating_add(self.config.base_address);
        if address < self.config.base_address || address > upper {
            return false;
        }
        if self.info.jump_target_at(address)
            || self.previous_labels.contains_key(&address)
            || self.auto_labels.contains_key(&address)
        {
            return false;
        }
        if self.info.segment_starts_at(address) {
            return false;
        }
        if self.info.comment_at(address).is_some() {
            return false;
        }
        true
    }

    /// Reads one instruction, demoting it to data bytes if an operand
    /// byte is refused.
    fn read_instruction(&mut self) {
        let address = self.cursor.address();
        let opcode = self.byte_at(self.offset);
        self.advance(1);
        let instruction = self.table.get(opcode);
        let data_byte = self.table.pseudo(DATA_BYTE);
        if instruction.is_data() {
            // An opcode with no assigned instruction.
            self.lines.push(AssemblyLine {
                address,
                instruction: data_byte,
                operand: u16::from(opcode),
            });
            return;
        }
        let mut operand = 0u16;
        if instruction.operand_length >= 1 {
            if !self.can_read_as_operand(self.cursor.address()) {
                self.lines.push(AssemblyLine {
                    address,
                    instruction: data_byte,
                    operand: u16::from(opcode),
                });
                return;
            }
            let low = self.byte_at(self.offset);
            self.advance(1);
            operand = u16::from(low);
            if instruction.operand_length == 2 {
                if !self.can_read_as_operand(self.cursor.address()) {
                    self.lines.push(AssemblyLine {
                        address,
                        instruction: data_byte,
                        operand: u16::from(opcode),
                    });
                    self.lines.push(AssemblyLine {
                        address: address + 1,
                        instruction: data_byte,
                        operand: u16::from(low),
                    });
                    return;
                }
                let high = self.byte_at(self.offset);
                self.advance(1);
                operand |= u16::from(high) << 8;
            }
        }
        let line = AssemblyLine { address, instruction, operand };
        self.create_label_if_needed(&line);
        self.lines.push(line);
    }

    /// Auto-generates a `jHHHH` label at the target of a branch; the
    /// first branch to reach an address wins for this pass.
    fn create_label_if_needed(&mut self, line: &AssemblyLine) {
        if line.instruction.is_branch()
            && line.instruction.operand_length > 0
        {
            let target = u32::from(line.operand);
            self.auto_labels
                .entry(target)
                .or_insert_with(|| branch_label_name(target));
        }
    }

    /// Reads a 16-bit data word.  If the effective data type changes
    /// between the two bytes, falls back to a single data byte and leaves
    /// the second byte for the next iteration.
    fn read_word(&mut self, data_type: DataType) {
        let address = self.cursor.address();
        if self.info.effective_type_at(address + 1) != data_type {
            let byte = self.byte_at(self.offset);
            self.push_data(DATA_BYTE, u16::from(byte));
            return;
        }
        let buffer = [self.byte_at(self.offset), self.byte_at(self.offset + 1)];
        let word = match data_type {
            DataType::WordsBE => BigEndian::read_u16(&buffer),
            _ => LittleEndian::read_u16(&buffer),
        };
        self.push_data(DATA_WORD, word);
    }

    /// Reads one return-vector-table entry (a little-endian pointer).
    /// When the run's label is indirect, derives `name[i]` at the target.
    fn read_ret_entry(&mut self, last_offset: u32) {
        let address = self.cursor.address();
        if self.offset >= last_offset
            || self.info.effective_type_at(address + 1) != DataType::RetTable
        {
            let byte = self.byte_at(self.offset);
            self.push_data(DATA_BYTE, u16::from(byte));
            return;
        }
        let buffer = [self.byte_at(self.offset), self.byte_at(self.offset + 1)];
        let target = u32::from(LittleEndian::read_u16(&buffer));
        self.push_data(DATA_RET, target as u16);
        if let Some(run_start) = self.ret_run_start
            && let Some(Label::Indirect { name, offset, .. }) =
                self.info.get_label(run_start)
        {
            let record_length = (*offset).max(1);
            let index = (address - run_start) / record_length;
            self.auto_labels
                .entry(run_start)
                .or_insert_with(|| name.clone());
            self.auto_labels
                .entry(target)
                .or_insert_with(|| format!("{}[{}]", name, index));
        }
    }
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{AssemblyLine, scan};
    use crate::annot::{AnnotationMap, DataType};
    use crate::config::Config;
    use crate::inst::{DATA_BYTE, DATA_RET, DATA_WORD};

    fn scan_plain(image: &[u8]) -> (Vec<AssemblyLine>, AnnotationMap) {
        let mut info = AnnotationMap::new();
        let config = Config::default();
        let lines = scan(&config, image, &mut info);
        (lines, info)
    }

    #[test]
    fn single_nop() {
        let (lines, _) = scan_plain(&[0x00]);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].address, 0);
        assert_eq!(lines[0].instruction.mnemonic, "NOP");
    }

    #[test]
    fn branch_creates_label() {
        let (lines, info) = scan_plain(&[0xc3, 0x03, 0x00, 0x76]);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].instruction.mnemonic, "JMP ");
        assert_eq!(lines[0].operand, 0x0003);
        assert_eq!(lines[1].address, 3);
        let label = info.get_label(3).unwrap();
        assert_eq!(label.operand_name(3), "j0003");
        assert!(info.jump_target_at(3));
    }

    #[test]
    fn backward_branch_splits_instruction_on_second_pass() {
        // The JMP at offset 3 targets address 2, which on the first pass
        // was consumed as an operand byte of the LXI at 0.  The second
        // pass must split the LXI into data bytes.
        let (lines, _) = scan_plain(&[0x01, 0x34, 0x12, 0xc3, 0x02, 0x00]);
        assert_eq!(lines[0].instruction.opcode, DATA_BYTE);
        assert_eq!(lines[0].operand, 0x01);
        assert_eq!(lines[1].instruction.opcode, DATA_BYTE);
        assert_eq!(lines[1].operand, 0x34);
        assert_eq!(lines[2].address, 2);
    }

    #[test]
    fn operand_refused_at_user_label() {
        let mut info = AnnotationMap::new();
        info.add_label("entry", 2, DataType::Undefined, true);
        let config = Config::default();
        let lines =
            scan(&config, &[0xcd, 0x04, 0x00, 0x00, 0x00], &mut info);
        assert_eq!(lines[0].address, 0);
        assert_eq!(lines[0].instruction.opcode, DATA_BYTE);
        assert_eq!(lines[0].operand, 0xcd);
        assert_eq!(lines[1].address, 1);
        assert_eq!(lines[1].operand, 0x04);
        assert_eq!(lines[2].address, 2);
        assert_eq!(lines[2].instruction.mnemonic, "NOP");
        for line in &lines {
            assert!(!(line.address < 2 && line.address + line.byte_len() > 2));
        }
    }

    #[test]
    fn operand_refused_at_segment_start() {
        let mut info = AnnotationMap::new();
        info.add_segment("rom", DataType::Code, 1, 4).unwrap();
        let config = Config::default();
        let lines = scan(&config, &[0x3e, 0x00], &mut info);
        // MVI A, cannot take its operand from the segment's first byte.
        assert_eq!(lines[0].instruction.opcode, DATA_BYTE);
        assert_eq!(lines[0].operand, 0x3e);
        assert_eq!(lines[1].address, 1);
    }

    #[test]
    fn undefined_opcode_is_data() {
        let (lines, _) = scan_plain(&[0x08, 0x00]);
        assert_eq!(lines[0].instruction.opcode, DATA_BYTE);
        assert_eq!(lines[0].operand, 0x08);
        assert_eq!(lines[1].instruction.mnemonic, "NOP");
    }

    #[test]
    fn words_regions() {
        let mut info = AnnotationMap::new();
        info.add_range_label("le", 0, 1, DataType::WordsLE, false);
        info.add_range_label("be", 2, 3, DataType::WordsBE, false);
        let config = Config::default();
        let lines =
            scan(&config, &[0x34, 0x12, 0x12, 0x34, 0x00], &mut info);
        assert_eq!(lines[0].instruction.opcode, DATA_WORD);
        assert_eq!(lines[0].operand, 0x1234);
        assert_eq!(lines[1].instruction.opcode, DATA_WORD);
        assert_eq!(lines[1].operand, 0x1234);
        assert_eq!(lines[2].instruction.mnemonic, "NOP");
    }

    #[test]
    fn word_split_at_type_boundary() {
        let mut info = AnnotationMap::new();
        // Only one byte of word-typed data; the word cannot complete.
        info.set_data_type(0, 1, DataType::WordsLE);
        let config = Config::default();
        let lines = scan(&config, &[0x34, 0x00], &mut info);
        assert_eq!(lines[0].instruction.opcode, DATA_BYTE);
        assert_eq!(lines[0].operand, 0x34);
        assert_eq!(lines[1].address, 1);
        assert_eq!(lines[1].instruction.mnemonic, "NOP");
    }

    #[test]
    fn ret_table_derives_labels() {
        let mut info = AnnotationMap::new();
        info.add_indirect_label("vec", 0, 2);
        info.set_data_type(4, 0x10000, DataType::Code);
        let config = Config::default();
        let image = [0x05, 0x00, 0x06, 0x00, 0x00, 0x76, 0x76];
        let lines = scan(&config, &image, &mut info);
        assert_eq!(lines[0].instruction.opcode, DATA_RET);
        assert_eq!(lines[0].operand, 0x0005);
        assert_eq!(lines[1].instruction.opcode, DATA_RET);
        assert_eq!(lines[1].operand, 0x0006);
        assert_eq!(
            info.get_label(5).unwrap().operand_name(5),
            "vec[0]"
        );
        assert_eq!(
            info.get_label(6).unwrap().operand_name(6),
            "vec[1]"
        );
    }

    #[test]
    fn base_address_offsets_the_lines() {
        let mut info = AnnotationMap::new();
        let config = Config {
            start_offset: 1,
            base_address: 0x8000,
            ..Config::default()
        };
        let lines = scan(&config, &[0xff, 0x00, 0xc3, 0x00, 0x80], &mut info);
        assert_eq!(lines[0].address, 0x8000);
        assert_eq!(lines[0].instruction.mnemonic, "NOP");
        assert_eq!(lines[1].address, 0x8001);
        assert_eq!(lines[1].operand, 0x8000);
        assert!(info.jump_target_at(0x8000));
    }

    #[test]
    fn end_offset_bounds_the_sweep() {
        let mut info = AnnotationMap::new();
        let config = Config { end_offset: 1, ..Config::default() };
        let lines = scan(&config, &[0x00, 0x00, 0x00, 0x00], &mut info);
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn truncated_operand_reads_zero() {
        // CALL with only one operand byte in the file; the missing high
        // byte reads as zero.
        let mut info = AnnotationMap::new();
        let config = Config { end_offset: 2, ..Config::default() };
        let lines = scan(&config, &[0xcd, 0x05], &mut info);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].instruction.mnemonic, "CALL ");
        assert_eq!(lines[0].operand, 0x0005);
    }

    #[test]
    fn empty_image() {
        let (lines, _) = scan_plain(&[]);
        assert!(lines.is_empty());
    }
}

//===========================================================================//
