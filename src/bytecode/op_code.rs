use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    OpConstant = 0,
    OpConstantLong = 1,
    OpNil = 2,
    OpTrue = 3,
    OpFalse = 4,
    OpPop = 5,
    OpGetLocal = 6,
    OpSetLocal = 7,
    OpGetGlobal = 8,
    OpDefineGlobal = 9,
    OpSetGlobal = 10,
    OpGetUpvalue = 11,
    OpSetUpvalue = 12,
    OpGetProperty = 13,
    OpSetProperty = 14,
    OpGetSuper = 15,
    OpEqual = 16,
    OpGreater = 17,
    OpLess = 18,
    OpAdd = 19,
    OpSubtract = 20,
    OpMultiply = 21,
    OpDivide = 22,
    OpModulo = 23,
    OpNot = 24,
    OpNegate = 25,
    OpPrint = 26,
    OpJump = 27,
    OpJumpIfFalse = 28,
    OpLoop = 29,
    OpCall = 30,
    OpInvoke = 31,
    OpSuperInvoke = 32,
    OpClosure = 33,
    OpCloseUpvalue = 34,
    OpReturn = 35,
    OpClass = 36,
    OpInherit = 37,
    OpMethod = 38,
    OpBuildList = 39,
    OpBuildMap = 40,
    OpIndex = 41,
    OpStore = 42,
    OpImport = 43,
    OpImportFrom = 44,
    OpExport = 45,
}

impl From<u8> for OpCode {
    fn from(byte: u8) -> Self {
        match byte {
            0 => OpCode::OpConstant,
            1 => OpCode::OpConstantLong,
            2 => OpCode::OpNil,
            3 => OpCode::OpTrue,
            4 => OpCode::OpFalse,
            5 => OpCode::OpPop,
            6 => OpCode::OpGetLocal,
            7 => OpCode::OpSetLocal,
            8 => OpCode::OpGetGlobal,
            9 => OpCode::OpDefineGlobal,
            10 => OpCode::OpSetGlobal,
            11 => OpCode::OpGetUpvalue,
            12 => OpCode::OpSetUpvalue,
            13 => OpCode::OpGetProperty,
            14 => OpCode::OpSetProperty,
            15 => OpCode::OpGetSuper,
            16 => OpCode::OpEqual,
            17 => OpCode::OpGreater,
            18 => OpCode::OpLess,
            19 => OpCode::OpAdd,
            20 => OpCode::OpSubtract,
            21 => OpCode::OpMultiply,
            22 => OpCode::OpDivide,
            23 => OpCode::OpModulo,
            24 => OpCode::OpNot,
            25 => OpCode::OpNegate,
            26 => OpCode::OpPrint,
            27 => OpCode::OpJump,
            28 => OpCode::OpJumpIfFalse,
            29 => OpCode::OpLoop,
            30 => OpCode::OpCall,
            31 => OpCode::OpInvoke,
            32 => OpCode::OpSuperInvoke,
            33 => OpCode::OpClosure,
            34 => OpCode::OpCloseUpvalue,
            35 => OpCode::OpReturn,
            36 => OpCode::OpClass,
            37 => OpCode::OpInherit,
            38 => OpCode::OpMethod,
            39 => OpCode::OpBuildList,
            40 => OpCode::OpBuildMap,
            41 => OpCode::OpIndex,
            42 => OpCode::OpStore,
            43 => OpCode::OpImport,
            44 => OpCode::OpImportFrom,
            45 => OpCode::OpExport,
            _ => panic!("Unknown opcode {}", byte),
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Reads a big-endian u16 operand (jump offsets).
pub fn read_u16(code: &[u8], offset: usize) -> u16 {
    ((code[offset] as u16) << 8) | (code[offset + 1] as u16)
}

/// Reads a little-endian u24 operand (long constant indices).
pub fn read_u24(code: &[u8], offset: usize) -> usize {
    (code[offset] as usize) | ((code[offset + 1] as usize) << 8) | ((code[offset + 2] as usize) << 16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_all_opcodes() {
        for byte in 0..=45u8 {
            let op = OpCode::from(byte);
            assert_eq!(op as u8, byte);
        }
    }

    #[test]
    #[should_panic(expected = "Unknown opcode")]
    fn test_unknown_opcode_panics() {
        let _ = OpCode::from(200);
    }

    #[test]
    fn test_read_u16_big_endian() {
        assert_eq!(read_u16(&[0x12, 0x34], 0), 0x1234);
    }

    #[test]
    fn test_read_u24_little_endian() {
        assert_eq!(read_u24(&[0x01, 0x02, 0x03], 0), 0x030201);
    }
}
