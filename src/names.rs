use crate::cpu::{RegisterAccess, REGISTER_COUNT};
use crate::decoder::Op;

const REGISTER_NAMES: [[&str; 3]; REGISTER_COUNT] = [
    ["", "", ""],
    ["al", "ah", "ax"],
    ["bl", "bh", "bx"],
    ["cl", "ch", "cx"],
    ["dl", "dh", "dx"],
    ["sp", "sp", "sp"],
    ["bp", "bp", "bp"],
    ["si", "si", "si"],
    ["di", "di", "di"],
    ["es", "es", "es"],
    ["cs", "cs", "cs"],
    ["ss", "ss", "ss"],
    ["ds", "ds", "ds"],
    ["ip", "ip", "ip"],
    ["flags", "flags", "flags"],
];

/// Assembly name of a register view, e.g. `ah` or `bx`. The "no register"
/// slot names as the empty string.
pub fn register_name(r: RegisterAccess) -> &'static str {
    let column = if r.width == 2 { 2 } else { usize::from(r.offset & 1) };
    REGISTER_NAMES[usize::from(r.index) % REGISTER_COUNT][column]
}

/// Lower-case assembly mnemonic; `Op::None` is the empty string.
pub fn mnemonic(op: Op) -> &'static str {
    match op {
        Op::None => "",
        Op::Mov => "mov",
        Op::Push => "push",
        Op::Pop => "pop",
        Op::Xchg => "xchg",
        Op::In => "in",
        Op::Out => "out",
        Op::Xlat => "xlat",
        Op::Lea => "lea",
        Op::Lds => "lds",
        Op::Les => "les",
        Op::Lahf => "lahf",
        Op::Sahf => "sahf",
        Op::Pushf => "pushf",
        Op::Popf => "popf",
        Op::Add => "add",
        Op::Adc => "adc",
        Op::Inc => "inc",
        Op::Aaa => "aaa",
        Op::Daa => "daa",
        Op::Sub => "sub",
        Op::Sbb => "sbb",
        Op::Dec => "dec",
        Op::Neg => "neg",
        Op::Cmp => "cmp",
        Op::Aas => "aas",
        Op::Das => "das",
        Op::Mul => "mul",
        Op::Imul => "imul",
        Op::Aam => "aam",
        Op::Div => "div",
        Op::Idiv => "idiv",
        Op::Aad => "aad",
        Op::Cbw => "cbw",
        Op::Cwd => "cwd",
        Op::Not => "not",
        Op::Shl => "shl",
        Op::Shr => "shr",
        Op::Sar => "sar",
        Op::Rol => "rol",
        Op::Ror => "ror",
        Op::Rcl => "rcl",
        Op::Rcr => "rcr",
        Op::And => "and",
        Op::Test => "test",
        Op::Or => "or",
        Op::Xor => "xor",
        Op::Rep => "rep",
        Op::Movs => "movs",
        Op::Cmps => "cmps",
        Op::Scas => "scas",
        Op::Lods => "lods",
        Op::Stos => "stos",
        Op::Call => "call",
        Op::Jmp => "jmp",
        Op::Ret => "ret",
        Op::Retf => "retf",
        Op::Je => "je",
        Op::Jl => "jl",
        Op::Jle => "jle",
        Op::Jb => "jb",
        Op::Jbe => "jbe",
        Op::Jp => "jp",
        Op::Jo => "jo",
        Op::Js => "js",
        Op::Jne => "jne",
        Op::Jnl => "jnl",
        Op::Jg => "jg",
        Op::Jnb => "jnb",
        Op::Ja => "ja",
        Op::Jnp => "jnp",
        Op::Jno => "jno",
        Op::Jns => "jns",
        Op::Loop => "loop",
        Op::Loopz => "loopz",
        Op::Loopnz => "loopnz",
        Op::Jcxz => "jcxz",
        Op::Int => "int",
        Op::Int3 => "int3",
        Op::Into => "into",
        Op::Iret => "iret",
        Op::Clc => "clc",
        Op::Cmc => "cmc",
        Op::Stc => "stc",
        Op::Cld => "cld",
        Op::Std => "std",
        Op::Cli => "cli",
        Op::Sti => "sti",
        Op::Hlt => "hlt",
        Op::Wait => "wait",
        Op::Esc => "esc",
        Op::Lock => "lock",
        Op::Segment => "segment",
    }
}

impl Op {
    pub fn mnemonic(self) -> &'static str {
        mnemonic(self)
    }
}
