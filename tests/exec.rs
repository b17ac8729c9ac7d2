use pretty_assertions::assert_eq;

use sim86::cpu::{Flags, Layout, Reg, Trap};
use sim86::decoder::Op;
use sim86::exec::SimExecutor;
use sim86::isa::i8086::I8086Decoder;
use sim86::{decode_bytes, Bus, Cpu, CpuConfig, Memory, Session};

fn load(program: &[u8]) -> Session {
    Session::load(CpuConfig::default(), program).unwrap()
}

fn run(program: &[u8]) -> Session {
    let mut s = load(program);
    s.run(1_000).unwrap();
    assert!(s.halted());
    s
}

#[test]
fn mov_then_add_immediate() {
    let mut s = load(&[
        0xB9, 0x05, 0x00, // mov cx,5
        0x83, 0xC1, 0x03, // add cx,3
    ]);
    let regs = s.step().unwrap();
    assert_eq!(regs.reg(Reg::C), 5);
    assert_eq!(regs.ip(), 3);

    let regs = s.step().unwrap();
    assert_eq!(regs.reg(Reg::C), 8);
    assert_eq!(regs.flags(), Flags::empty());
    assert_eq!(regs.current_instruction, 2);
    assert_eq!(regs.current_byte, 6);
}

#[test]
fn loop_falls_through_when_cx_reaches_zero() {
    let mut s = load(&[
        0xB9, 0x01, 0x00, // mov cx,1
        0xE2, 0xFE, // loop -2
    ]);
    s.step().unwrap();
    let regs = s.step().unwrap();
    assert_eq!(regs.reg(Reg::C), 0);
    assert_eq!(regs.ip(), 5);
}

#[test]
fn loop_branches_while_cx_is_nonzero() {
    let mut s = load(&[0xB9, 0x02, 0x00, 0xE2, 0xFE]);
    s.step().unwrap();
    let regs = s.step().unwrap();
    assert_eq!(regs.reg(Reg::C), 1);
    assert_eq!(regs.ip(), 3);
}

#[test]
fn loopnz_needs_zf_clear() {
    let mut s = load(&[
        0xB9, 0x02, 0x00, // mov cx,2
        0xE0, 0xFE, // loopnz -2
    ]);
    s.step().unwrap();
    assert_eq!(s.step().unwrap().ip(), 3);
    assert_eq!(s.step().unwrap().ip(), 5);
    assert_eq!(s.regs().reg(Reg::C), 0);

    let mut s = load(&[
        0xB9, 0x02, 0x00, // mov cx,2
        0x3D, 0x00, 0x00, // cmp ax,0  (ZF=1)
        0xE0, 0xFE, // loopnz -2
    ]);
    s.run(3).unwrap();
    assert_eq!(s.regs().reg(Reg::C), 1);
    assert_eq!(s.regs().ip(), 8);
}

#[test]
fn unrecognized_byte_traps_without_touching_state() {
    let mut s = load(&[0x60]);
    let before = s.regs().clone();
    assert_eq!(s.step(), Err(Trap::InvalidInstruction { ip: 0 }));
    assert_eq!(*s.regs(), before);
}

#[test]
fn countdown_loop_runs_to_completion() {
    let mut s = load(&[
        0xB9, 0x03, 0x00, // mov cx,3
        0x83, 0xE9, 0x01, // sub cx,1
        0x75, 0xFB, // jne -5
    ]);
    assert_eq!(s.run(100).unwrap(), 7);
    assert!(s.halted());
    assert_eq!(s.regs().reg(Reg::C), 0);
    assert_eq!(s.regs().ip(), 8);
    assert!(s.regs().flags().contains(Flags::ZF | Flags::PF));
}

#[test]
fn sub_borrow_sets_status_flags() {
    let s = run(&[
        0xB8, 0x01, 0x00, // mov ax,1
        0x2D, 0x02, 0x00, // sub ax,2
    ]);
    assert_eq!(s.regs().reg(Reg::A), 0xFFFF);
    assert_eq!(
        s.regs().flags(),
        Flags::CF | Flags::PF | Flags::AF | Flags::SF
    );
}

#[test]
fn cmp_sets_flags_but_keeps_the_register() {
    let s = run(&[
        0xB8, 0x10, 0x00, // mov ax,16
        0x3D, 0x10, 0x00, // cmp ax,16
    ]);
    assert_eq!(s.regs().reg(Reg::A), 16);
    assert_eq!(s.regs().flags(), Flags::ZF | Flags::PF);
}

#[test]
fn add_register_to_register() {
    let s = run(&[
        0xB8, 0xFF, 0x7F, // mov ax,0x7fff
        0xBB, 0x01, 0x00, // mov bx,1
        0x01, 0xD8, // add ax,bx
    ]);
    assert_eq!(s.regs().reg(Reg::A), 0x8000);
    assert_eq!(
        s.regs().flags(),
        Flags::OF | Flags::SF | Flags::AF | Flags::PF
    );
}

#[test]
fn byte_register_writes_keep_the_other_half() {
    let s = run(&[
        0xB0, 0xFF, // mov al,0xff
        0xB4, 0x12, // mov ah,0x12
    ]);
    assert_eq!(s.regs().reg(Reg::A), 0x12FF);

    // the sum is formed on 16 bits, only the low byte lands in al
    let s = run(&[
        0xB0, 0xFF, // mov al,0xff
        0xB4, 0x12, // mov ah,0x12
        0x04, 0x01, // add al,1
    ]);
    assert_eq!(s.regs().reg(Reg::A), 0x1200);
    assert_eq!(s.regs().flags(), Flags::AF | Flags::PF);
}

#[test]
fn test_only_ever_clears_zf() {
    let mut s = load(&[
        0xB0, 0x05, // mov al,5
        0x3C, 0x05, // cmp al,5
        0xA8, 0x02, // test al,2
        0xA8, 0x04, // test al,4
    ]);
    s.run(3).unwrap();
    assert_eq!(s.regs().flags(), Flags::ZF | Flags::PF);
    s.step().unwrap();
    assert_eq!(s.regs().flags(), Flags::PF);
}

#[test]
fn xor_clears_only_carry_and_overflow() {
    let s = run(&[
        0xB8, 0x01, 0x00, // mov ax,1
        0x2D, 0x02, 0x00, // sub ax,2
        0x31, 0xC0, // xor ax,ax
    ]);
    assert_eq!(s.regs().reg(Reg::A), 0);
    assert_eq!(s.regs().flags(), Flags::PF | Flags::AF | Flags::SF);
}

#[test]
fn conditional_jumps_follow_flags() {
    // jb taken: skips mov cx,9
    let s = run(&[
        0xB8, 0x01, 0x00, // mov ax,1
        0x2D, 0x02, 0x00, // sub ax,2
        0x72, 0x03, // jb +3
        0xB9, 0x09, 0x00, // mov cx,9
        0xBA, 0x07, 0x00, // mov dx,7
    ]);
    assert_eq!(s.regs().reg(Reg::C), 0);
    assert_eq!(s.regs().reg(Reg::D), 7);

    // je not taken
    let s = run(&[
        0xB8, 0x01, 0x00, // mov ax,1
        0x3D, 0x02, 0x00, // cmp ax,2
        0x74, 0x03, // je +3
        0xB9, 0x09, 0x00, // mov cx,9
    ]);
    assert_eq!(s.regs().reg(Reg::C), 9);

    // jp taken on an even-parity result
    let s = run(&[
        0xB8, 0x03, 0x00, // mov ax,3
        0x3D, 0x00, 0x00, // cmp ax,0
        0x7A, 0x03, // jp +3
        0xB9, 0x09, 0x00, // mov cx,9
    ]);
    assert_eq!(s.regs().reg(Reg::C), 0);
}

#[test]
fn jmp_immediate_and_register() {
    let s = run(&[
        0xEB, 0x03, // jmp +3
        0xB9, 0x09, 0x00, // mov cx,9
        0xBA, 0x07, 0x00, // mov dx,7
    ]);
    assert_eq!(s.regs().reg(Reg::C), 0);
    assert_eq!(s.regs().reg(Reg::D), 7);

    let s = run(&[
        0xBB, 0x03, 0x00, // mov bx,3
        0xFF, 0xE3, // jmp bx  (ip += bx)
        0xB9, 0x09, 0x00, // mov cx,9
    ]);
    assert_eq!(s.regs().reg(Reg::C), 0);
    assert_eq!(s.regs().ip(), 8);
}

#[test]
fn mov_through_the_data_segment() {
    let s = run(&[
        0xC7, 0x06, 0xE8, 0x03, 0x34, 0x12, // mov word [1000],0x1234
        0xC6, 0x06, 0xEA, 0x03, 0xAB, // mov byte [1002],0xab
        0x8B, 0x1E, 0xE8, 0x03, // mov bx,[1000]
        0x89, 0x1E, 0xD0, 0x07, // mov [2000],bx
        0xBE, 0xE8, 0x03, // mov si,1000
        0x8B, 0x44, 0x02, // mov ax,[si+2]
        0x8A, 0x2C, // mov ch,[si]
    ]);
    let data = s.cpu.segments.data;
    assert_eq!(s.mem.read_u16(data, 1000), 0x1234);
    assert_eq!(s.mem.read_u8(data, 1002), 0xAB);
    assert_eq!(s.mem.read_u8(data, 1003), 0x00);
    assert_eq!(s.mem.read_u16(data, 2000), 0x1234);
    assert_eq!(s.regs().reg(Reg::B), 0x1234);
    assert_eq!(s.regs().reg(Reg::A), 0x00AB);
    assert_eq!(s.regs().reg(Reg::C), 0x3400);
    // code segment is untouched
    assert_eq!(s.mem.read_u16(s.cpu.segments.code, 1000), 0);
}

#[test]
fn push_grows_upward_and_pop_reads_at_sp() {
    let mut s = load(&[
        0xB8, 0x34, 0x12, // mov ax,0x1234
        0x50, // push ax
        0x83, 0xEC, 0x02, // sub sp,2
        0x5B, // pop bx
    ]);
    s.run(2).unwrap();
    let stack = s.cpu.segments.stack;
    assert_eq!(s.mem.read_u16(stack, 0), 0x1234);
    assert_eq!(s.regs().reg(Reg::Sp), 2);

    s.run(2).unwrap();
    assert_eq!(s.regs().reg(Reg::B), 0x1234);
    assert_eq!(s.regs().reg(Reg::Sp), 0xFFFE);
}

#[test]
fn call_spills_the_register_file() {
    let s = run(&[
        0xBC, 0x00, 0x01, // mov sp,0x100
        0xB8, 0xAA, 0xAA, // mov ax,0xaaaa
        0xE8, 0x01, 0x00, // call +1
        0x90, // skipped
        0xC3, // ret
    ]);
    let stack = s.cpu.segments.stack;
    assert_eq!(s.mem.read_u16(stack, 0x100), 0xAAAA);
    // sp is stored with the value it had reached when its turn came
    assert_eq!(s.mem.read_u16(stack, 0x108), 0x108);
    // ip is already past the call
    assert_eq!(s.mem.read_u16(stack, 0x118), 9);
    assert_eq!(s.regs().reg(Reg::Sp), 0x100 + 28);
    assert_eq!(s.regs().ip(), 11);
    assert_eq!(s.cpu.regs.current_instruction, 4);
}

#[test]
fn ret_adds_its_immediate() {
    let s = run(&[0xC2, 0x08, 0x00, 0, 0, 0, 0, 0, 0, 0, 0]);
    assert_eq!(s.regs().ip(), 11);
}

#[test]
fn unsupported_operations_and_operands_trap() {
    let mut s = load(&[0x40]); // inc ax
    assert_eq!(
        s.step(),
        Err(Trap::UnsupportedOperation { ip: 0, op: Op::Inc })
    );

    let mut s = load(&[0x01, 0x07]); // add [bx],ax
    assert_eq!(
        s.step(),
        Err(Trap::UnsupportedOperands {
            ip: 0,
            instruction: decode_bytes(&[0x01, 0x07]),
        })
    );

    let mut s = load(&[0x90, 0x2E, 0x8B, 0x07]); // nop; cs: mov ax,[bx]
    assert_eq!(
        s.step(),
        Err(Trap::UnsupportedOperation { ip: 0, op: Op::Xchg })
    );

    let mut s = load(&[0x2E, 0x8B, 0x07]);
    let err = s.step().unwrap_err();
    assert!(matches!(err, Trap::UnsupportedOperands { ip: 0, .. }));
    assert_eq!(err.to_string(), "Operand combination for `mov` at ip 0x0000 is not supported");
}

#[test]
fn flat_layout_shares_memory_and_wraps_counters() {
    let cfg = CpuConfig {
        layout: Layout::Flat,
        ..CpuConfig::default()
    };
    let mut s = Session::load(
        cfg,
        &[
            0xB8, 0x90, 0x90, // mov ax,0x9090
            0xA3, 0x00, 0x00, // mov [0],ax
        ],
    )
    .unwrap();
    let regs = s.step().unwrap();
    assert_eq!((regs.current_byte, regs.current_instruction), (3, 1));
    let regs = s.step().unwrap();
    assert_eq!((regs.current_byte, regs.current_instruction), (0, 0));
    assert_eq!(&s.mem.mem[..2], &[0x90, 0x90]);
}

#[test]
fn cpu_steps_against_a_caller_owned_bus() {
    let cfg = CpuConfig::default();
    let mut mem = Memory::new(cfg.arena_size());
    let mut cpu = Cpu::new(cfg);
    mem.load(cpu.segments.code, &[0xBA, 0x2A, 0x00]); // mov dx,42
    cpu.program_len = 3;
    cpu.reset(0);

    let dec = I8086Decoder::new();
    let exec = SimExecutor;
    cpu.step(&mut mem, &dec, &exec).unwrap();
    assert_eq!(cpu.regs.reg(Reg::D), 42);
    assert!(cpu.halted());
}

#[test]
fn version_matches_the_package() {
    assert_eq!(sim86::version(), env!("CARGO_PKG_VERSION"));
}
