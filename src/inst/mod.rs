//! Instruction descriptors and the fixed 8085 opcode table.

mod i8085;

//===========================================================================//

/// Pseudo-opcode for a raw data byte in the listing.
pub const DATA_BYTE: u16 = 0x100;
/// Pseudo-opcode for a raw 16-bit data word in the listing.
pub const DATA_WORD: u16 = 0x101;
/// Pseudo-opcode for a text byte in the listing.
pub const DATA_TEXT: u16 = 0x102;
/// Pseudo-opcode for a return-vector-table entry in the listing.
pub const DATA_RET: u16 = 0x103;

/// The opcode of the unconditional return instruction, which gets a blank
/// line after it in the listing to separate subroutines.
pub const OPCODE_RET: u16 = 0xc9;

//===========================================================================//

/// The broad category of an instruction.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum InstructionType {
    /// Processor control (NOP, HLT, interrupt masking).
    Control,
    /// Jumps, calls, returns, and restarts.
    Branch,
    /// Arithmetic and logic.
    Arithmetic,
    /// Register, memory, stack, and I/O transfers.
    Move,
    /// A pseudo-instruction carrying raw data.
    Data,
}

/// How an instruction's operand is to be rendered.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum OperandType {
    /// No operand.
    None,
    /// An immediate value (`#hh` or `#hhhh`).
    Immediate,
    /// An address, rendered as a label when one exists.
    Address,
    /// An immediate value that frequently names an address (e.g. LXI);
    /// rendered as `label(#hhhh)` when a label exists at the value.
    ImmediateHybrid,
    /// A raw byte rendered as a character.
    Character,
}

//===========================================================================//

/// A single entry of the instruction table.
#[derive(Debug)]
pub struct Instruction {
    /// The numeric tag: the opcode byte, or a pseudo-opcode above `0xff`.
    pub opcode: u16,
    /// The display string, including any register operands and the
    /// separator before a value operand (e.g. `"LXI B,"`, `"JMP "`).
    pub mnemonic: &'static str,
    /// The broad category of this instruction.
    pub instruction_type: InstructionType,
    /// The number of operand bytes following the opcode (0, 1, or 2).
    /// For pseudo-instructions, the number of image bytes represented.
    pub operand_length: u32,
    /// How the operand is rendered.
    pub operand_type: OperandType,
}

impl Instruction {
    /// Returns true for the data pseudo-instructions (including table
    /// entries for opcodes undefined on the 8085).
    pub fn is_data(&self) -> bool {
        self.instruction_type == InstructionType::Data
    }

    /// Returns true if this instruction transfers control and therefore
    /// wants a label at its operand target.
    pub fn is_branch(&self) -> bool {
        self.instruction_type == InstructionType::Branch
    }
}

//===========================================================================//

/// A fixed lookup table from opcode bytes (and pseudo-opcodes) to
/// instruction descriptors.  The table is immutable and freely shared.
#[derive(Clone, Copy)]
pub struct InstructionTable {
    entries: &'static [Instruction; 260],
}

impl InstructionTable {
    /// Returns the Intel 8085 instruction table.
    pub fn i8085() -> InstructionTable {
        InstructionTable { entries: &i8085::INSTRUCTIONS }
    }

    /// Looks up the descriptor for an opcode byte.  Opcodes undefined on
    /// the processor map to the data-byte pseudo-instruction.
    pub fn get(&self, opcode: u8) -> &'static Instruction {
        &self.entries[usize::from(opcode)]
    }

    /// Looks up the descriptor for a pseudo-opcode ([`DATA_BYTE`] through
    /// [`DATA_RET`]).
    pub fn pseudo(&self, opcode: u16) -> &'static Instruction {
        debug_assert!((DATA_BYTE..=DATA_RET).contains(&opcode));
        &self.entries[0x100 + usize::from(opcode - DATA_BYTE)]
    }
}

//===========================================================================//


//===========================================================================//
