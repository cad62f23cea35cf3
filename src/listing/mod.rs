//! Formats the final line list as listing text.

use crate::annot::{AnnotationMap, Cursor};
use crate::config::Config;
use crate::dis::AssemblyLine;
use crate::inst::{
    DATA_BYTE, DATA_RET, DATA_TEXT, DATA_WORD, OPCODE_RET, OperandType,
};
use crate::literal::{hex8, hex16};

//===========================================================================//

const INDENT: &str = "    ";
const LABEL_LIMIT: usize = 7;

/// How many data items may share one line (text runs are unlimited).
const ITEMS_PER_LINE: usize = 8;

//===========================================================================//

/// Renders assembly lines as text: address and label columns, operands
/// with symbolic names, merged data runs, and segment banners.
pub struct ListingWriter<'a> {
    config: &'a Config,
    info: &'a AnnotationMap,
}

impl<'a> ListingWriter<'a> {
    /// Constructs a writer over the given configuration and annotations.
    pub fn new(config: &'a Config, info: &'a AnnotationMap) -> ListingWriter<'a> {
        ListingWriter { config, info }
    }

    /// Formats the whole line list.
    pub fn write(&self, lines: &[AssemblyLine]) -> String {
        let mut out = String::new();
        let mut cursor = self.info.cursor(self.config.base_address);
        let mut index = 0;
        while index < lines.len() {
            if cursor.is_segment_start() {
                let name = cursor.segment().map(|s| s.name.clone());
                if let Some(name) = name {
                    out.push_str("\n\n=== Start of ");
                    out.push_str(&name);
                    out.push_str(" ===\n");
                }
            }
            index = self.write_row(&mut out, lines, index, &mut cursor);
        }
        out
    }

    /// Writes one output row starting at `lines[start]`, merging
    /// consecutive data items onto it, and returns the index of the first
    /// line not consumed.
    fn write_row(
        &self,
        out: &mut String,
        lines: &[AssemblyLine],
        start: usize,
        cursor: &mut Cursor<'_>,
    ) -> usize {
        let first = &lines[start];
        debug_assert_eq!(cursor.address(), first.address);
        if self.config.address_column {
            out.push('$');
            out.push_str(&hex16(first.address));
            out.push_str(INDENT);
        }
        self.write_label_column(out, first.address);
        out.push_str(first.instruction.mnemonic);
        self.write_operand(out, first);
        let mut comment = cursor.comment().map(|c| c.text.clone());
        let mut ended_segment = None;
        self.step_over(cursor, first.byte_len(), &mut ended_segment);
        let opcode = first.instruction.opcode;
        let mut count = 1;
        let mut index = start + 1;
        if first.instruction.is_data() {
            while index < lines.len() {
                let item = &lines[index];
                if item.instruction.opcode != opcode
                    || comment.is_some()
                    || ended_segment.is_some()
                    || (count >= ITEMS_PER_LINE && opcode != DATA_TEXT)
                    || self.info.jump_target_at(item.address)
                    || cursor.is_segment_start()
                {
                    break;
                }
                if opcode != DATA_TEXT {
                    out.push(',');
                }
                self.write_operand(out, item);
                comment = cursor.comment().map(|c| c.text.clone());
                self.step_over(cursor, item.byte_len(), &mut ended_segment);
                count += 1;
                index += 1;
            }
        }
        if let Some(text) = comment {
            out.push_str(INDENT);
            out.push(';');
            out.push_str(&text);
        }
        out.push('\n');
        if opcode == OPCODE_RET {
            out.push('\n');
        }
        if let Some(name) = ended_segment {
            out.push_str("\n=== End of ");
            out.push_str(&name);
            out.push_str(" ===\n");
        }
        index
    }

    /// Writes the label column: a jump-target label padded into a
    /// 7-column field, a too-long label on its own line, or plain
    /// indentation.
    fn write_label_column(&self, out: &mut String, address: u32) {
        let name = match self.info.get_label(address) {
            Some(label) if label.is_jump_target(address) => {
                label.jump_target_name(address)
            }
            _ => "",
        };
        if name.is_empty() {
            out.push_str(INDENT);
            out.push_str(INDENT);
        } else if name.len() > LABEL_LIMIT {
            out.push_str(name);
            out.push_str(":\n");
            if self.config.address_column {
                out.push_str("     ");
            }
            out.push_str(INDENT);
            out.push_str(INDENT);
            out.push_str(INDENT);
        } else {
            let field = format!("{}:", name);
            out.push_str(&format!("{:<width$}", field, width = LABEL_LIMIT));
        }
    }

    /// Writes a single operand.  Data words print a label when one exists
    /// at the stored value; return vectors always print the raw pointer.
    fn write_operand(&self, out: &mut String, line: &AssemblyLine) {
        let value = u32::from(line.operand);
        match line.instruction.opcode {
            DATA_BYTE => {
                out.push('$');
                out.push_str(&hex8(value));
            }
            DATA_WORD => self.write_address_operand(out, value),
            DATA_TEXT => out.push(line.operand as u8 as char),
            DATA_RET => {
                out.push('$');
                out.push_str(&hex16(value));
            }
            _ => match line.instruction.operand_type {
                OperandType::None => {}
                OperandType::Address => {
                    self.write_address_operand(out, value)
                }
                OperandType::Immediate => {
                    out.push('#');
                    if line.instruction.operand_length == 2 {
                        out.push_str(&hex16(value));
                    } else {
                        out.push_str(&hex8(value));
                    }
                }
                OperandType::ImmediateHybrid => {
                    let hex = if line.instruction.operand_length == 2 {
                        hex16(value)
                    } else {
                        hex8(value)
                    };
                    match self.info.get_label(value) {
                        Some(label) => {
                            out.push_str(&label.operand_name(value));
                            out.push_str("(#");
                            out.push_str(&hex);
                            out.push(')');
                        }
                        None => {
                            out.push('#');
                            out.push_str(&hex);
                        }
                    }
                }
                OperandType::Character => {
                    out.push(line.operand as u8 as char)
                }
            },
        }
    }

    fn write_address_operand(&self, out: &mut String, value: u32) {
        match self.info.get_label(value) {
            Some(label) => out.push_str(&label.operand_name(value)),
            None => {
                out.push('$');
                out.push_str(&hex16(value));
            }
        }
    }

    /// Advances the cursor over the bytes of one item, remembering the
    /// name of any segment whose last byte was crossed.
    fn step_over(
        &self,
        cursor: &mut Cursor<'_>,
        count: u32,
        ended_segment: &mut Option<String>,
    ) {
        for _ in 0..count {
            if cursor.is_segment_end()
                && let Some(segment) = cursor.segment()
            {
                *ended_segment = Some(segment.name.clone());
            }
            cursor.advance();
        }
    }
}

//===========================================================================//
