//! Label variants and their naming rules.

use crate::annot::DataType;
use crate::literal::hex16;

//===========================================================================//

/// A user- or scanner-defined name attached to one or more addresses.
///
/// All labels live in an arena owned by the annotation map; the map's
/// address index stores arena indices, so a range label is stored once and
/// shared by every address it covers.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Label {
    /// A name for a single address.
    Point {
        /// The label's name.
        name: String,
        /// The address the label points at.
        address: u32,
        /// The data type governing the labeled byte, if any.
        data_type: DataType,
        /// Whether the name appears as a header in the label column of
        /// its own line (rather than only in operand position).
        jump_target: bool,
    },
    /// A name for an inclusive range of addresses; interior addresses are
    /// referenced as `name[i]`, indexed from the start.
    Range {
        /// The base name of the range.
        name: String,
        /// The first covered address.
        start: u32,
        /// The last covered address.
        end: u32,
        /// The data type governing the covered bytes, if any.
        data_type: DataType,
        /// Whether interior addresses also act as jump-target headers
        /// (the head always does).
        jump_target: bool,
    },
    /// A name for a table of 16-bit pointers.  Each scanned table entry
    /// induces a derived `name[i]` label at the pointed-to address.
    Indirect {
        /// The base name of the table.
        name: String,
        /// The address of the table's first entry.
        address: u32,
        /// The record length in bytes (pointer spacing within the table).
        offset: u32,
    },
}

impl Label {
    /// Returns the name rendered in the label column when a line begins
    /// at `address`, or the empty string for addresses that never head a
    /// line (interior range addresses).
    pub fn jump_target_name(&self, address: u32) -> &str {
        match self {
            Label::Point { name, .. } => name,
            Label::Range { name, start, .. } => {
                if address == *start {
                    name
                } else {
                    ""
                }
            }
            Label::Indirect { name, .. } => name,
        }
    }

    /// Returns the name rendered when `address` appears in operand
    /// position.  Interior range addresses get an index suffix.
    pub fn operand_name(&self, address: u32) -> String {
        match self {
            Label::Point { name, .. } => name.clone(),
            Label::Range { name, start, .. } => {
                if address == *start {
                    name.clone()
                } else {
                    format!("{}[{}]", name, address - start)
                }
            }
            Label::Indirect { name, .. } => name.clone(),
        }
    }

    /// Returns true if this label heads its own line at `address`.
    pub fn is_jump_target(&self, address: u32) -> bool {
        match self {
            Label::Point { jump_target, .. } => *jump_target,
            Label::Range { start, jump_target, .. } => {
                address == *start || *jump_target
            }
            Label::Indirect { .. } => true,
        }
    }

    /// Returns the data type this label imposes, or `Undefined` if it
    /// imposes none.
    pub fn data_type(&self) -> DataType {
        match self {
            Label::Point { data_type, .. } => *data_type,
            Label::Range { data_type, .. } => *data_type,
            Label::Indirect { .. } => DataType::Undefined,
        }
    }
}

//===========================================================================//

/// An auto-generated branch-target name: `j` plus the 4-hex-digit target.
pub fn branch_label_name(target: u32) -> String {
    format!("j{}", hex16(target))
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{DataType, Label, branch_label_name};

    #[test]
    fn point_label_names() {
        let label = Label::Point {
            name: "loop".to_string(),
            address: 0x1234,
            data_type: DataType::Undefined,
            jump_target: true,
        };
        assert_eq!(label.jump_target_name(0x1234), "loop");
        assert_eq!(label.operand_name(0x1234), "loop");
        assert!(label.is_jump_target(0x1234));
    }

    #[test]
    fn range_label_names() {
        let label = Label::Range {
            name: "table".to_string(),
            start: 0x100,
            end: 0x10f,
            data_type: DataType::Bytes,
            jump_target: false,
        };
        assert_eq!(label.jump_target_name(0x100), "table");
        assert_eq!(label.jump_target_name(0x105), "");
        assert_eq!(label.operand_name(0x100), "table");
        assert_eq!(label.operand_name(0x101), "table[1]");
        assert_eq!(label.operand_name(0x10f), "table[15]");
        assert!(label.is_jump_target(0x100));
        assert!(!label.is_jump_target(0x105));
    }

    #[test]
    fn branch_label_names_are_hex() {
        assert_eq!(branch_label_name(0x0003), "j0003");
        assert_eq!(branch_label_name(0xfffe), "jfffe");
    }
}

//===========================================================================//
