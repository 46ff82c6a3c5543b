use ls8_ensemble::ast::Instr;
use ls8_ensemble::err::{LexErr, LoadErrKind};
use ls8_ensemble::parse::{parse_program, Program};
use ls8_ensemble::sim::device::{BufferedDisplay, ChannelDisplay};
use ls8_ensemble::sim::mem::MachineInitStrategy;
use ls8_ensemble::sim::{SimErr, SimFlags, Simulator};

const HLT:  u8 = 0b0000_0001;
const RET:  u8 = 0b0001_0001;
const PUSH: u8 = 0b0100_0101;
const POP:  u8 = 0b0100_0110;
const PRN:  u8 = 0b0100_0111;
const CALL: u8 = 0b0101_0000;
const JEQ:  u8 = 0b0101_0101;
const JNE:  u8 = 0b0101_0110;
const LDI:  u8 = 0b1000_0010;
const ADD:  u8 = 0b1010_0000;
const MUL:  u8 = 0b1010_0010;
const CMP:  u8 = 0b1010_0111;

const PRINT8: &str = "
# print8.ls8
#
# Prints the number 8

10000010 # LDI R0,8
00000000
00001000
01000111 # PRN R0
00000000
00000001 # HLT
";

const MULT: &str = "
# mult.ls8
#
# Multiplies 8 and 9, then prints the result

10000010 # LDI R0,8
00000000
00001000
10000010 # LDI R1,9
00000001
00001001
10100010 # MUL R0,R1
00000000
00000001
01000111 # PRN R0
00000000
00000001 # HLT
";

/// Writes instructions as program text, one byte per line,
/// commenting the opcode line of each instruction.
fn source(instrs: &[(&str, &[u8])]) -> String {
    let mut out = String::new();
    for (comment, bytes) in instrs {
        for (i, byte) in bytes.iter().enumerate() {
            match i {
                0 => out.push_str(&format!("{byte:08b} # {comment}\n")),
                _ => out.push_str(&format!("{byte:08b}\n")),
            }
        }
    }
    out
}

fn run(src: &str) -> (Simulator, Result<(), SimErr>, Vec<u8>) {
    let program = parse_program(src).unwrap();
    let display = BufferedDisplay::default();

    let mut sim = Simulator::new(Default::default());
    sim.set_output(display.clone());
    sim.load_program(&program);
    let result = sim.run_with_limit(10_000);

    let output = display.get_buffer().read().unwrap().clone();
    (sim, result, output)
}

#[test]
fn test_print8() {
    let (sim, result, output) = run(PRINT8);
    assert_eq!(result, Ok(()));
    assert!(sim.hit_halt());
    assert_eq!(output, [8]);
}

#[test]
fn test_mult() {
    let (sim, result, output) = run(MULT);
    assert_eq!(result, Ok(()));
    assert!(sim.hit_halt());
    assert_eq!(output, [72]);
}

#[test]
fn test_stack() {
    let src = source(&[
        ("LDI R0,1", &[LDI, 0, 1]),
        ("LDI R1,2", &[LDI, 1, 2]),
        ("PUSH R0",  &[PUSH, 0]),
        ("PUSH R1",  &[PUSH, 1]),
        ("LDI R0,3", &[LDI, 0, 3]),
        ("POP R0",   &[POP, 0]),
        ("PRN R0",   &[PRN, 0]),
        ("LDI R0,4", &[LDI, 0, 4]),
        ("PUSH R0",  &[PUSH, 0]),
        ("POP R2",   &[POP, 2]),
        ("POP R1",   &[POP, 1]),
        ("PRN R2",   &[PRN, 2]),
        ("PRN R1",   &[PRN, 1]),
        ("HLT",      &[HLT]),
    ]);

    let (sim, result, output) = run(&src);
    assert_eq!(result, Ok(()));
    assert!(sim.hit_halt());
    assert_eq!(output, [2, 4, 1]);
}

#[test]
fn test_call() {
    let src = source(&[
        ("LDI R1,MULT2PRINT", &[LDI, 1, 24]),
        ("LDI R0,10",         &[LDI, 0, 10]),
        ("CALL R1",           &[CALL, 1]),
        ("LDI R0,15",         &[LDI, 0, 15]),
        ("CALL R1",           &[CALL, 1]),
        ("LDI R0,18",         &[LDI, 0, 18]),
        ("CALL R1",           &[CALL, 1]),
        ("LDI R0,30",         &[LDI, 0, 30]),
        ("CALL R1",           &[CALL, 1]),
        ("HLT",               &[HLT]),
        // MULT2PRINT (address 24):
        ("ADD R0,R0",         &[ADD, 0, 0]),
        ("PRN R0",            &[PRN, 0]),
        ("RET",               &[RET]),
    ]);

    let (sim, result, output) = run(&src);
    assert_eq!(result, Ok(()));
    assert!(sim.hit_halt());
    assert_eq!(output, [20, 30, 36, 60]);
    assert_eq!(sim.frame_depth(), 0);
}

#[test]
fn test_sctest() {
    let src = source(&[
        ("LDI R0,10",     &[LDI, 0, 10]), // 0
        ("LDI R1,20",     &[LDI, 1, 20]), // 3
        ("LDI R2,TEST1",  &[LDI, 2, 19]), // 6
        ("CMP R0,R1",     &[CMP, 0, 1]),  // 9
        ("JEQ R2",        &[JEQ, 2]),     // 12
        ("LDI R3,1",      &[LDI, 3, 1]),  // 14
        ("PRN R3",        &[PRN, 3]),     // 17
        // TEST1:
        ("LDI R2,TEST2",  &[LDI, 2, 32]), // 19
        ("CMP R0,R1",     &[CMP, 0, 1]),  // 22
        ("JNE R2",        &[JNE, 2]),     // 25
        ("LDI R3,2",      &[LDI, 3, 2]),  // 27
        ("PRN R3",        &[PRN, 3]),     // 30
        // TEST2:
        ("LDI R1,10",     &[LDI, 1, 10]), // 32
        ("LDI R2,TEST3",  &[LDI, 2, 45]), // 35
        ("CMP R0,R1",     &[CMP, 0, 1]),  // 38
        ("JEQ R2",        &[JEQ, 2]),     // 41
        ("HLT",           &[HLT]),        // 43
        ("HLT",           &[HLT]),        // 44
        // TEST3:
        ("LDI R3,3",      &[LDI, 3, 3]),  // 45
        ("PRN R3",        &[PRN, 3]),     // 48
        ("HLT",           &[HLT]),        // 50
    ]);

    let (sim, result, output) = run(&src);
    assert_eq!(result, Ok(()));
    assert!(sim.hit_halt());
    assert_eq!(output, [1, 3]);
    assert!(sim.cond().is_equal());
}

#[test]
fn test_disassemble() {
    let program = parse_program(MULT).unwrap();
    let bytes = program.as_bytes();

    let mut listing = vec![];
    let mut pc = 0;
    while pc < bytes.len() {
        let window = std::array::from_fn(|i| bytes.get(pc + i).copied().unwrap_or(0));
        let instr = Instr::decode(window).unwrap();
        listing.push(instr.to_string());
        pc += usize::from(instr.opcode().width());
    }

    assert_eq!(listing, ["LDI R0, 8", "LDI R1, 9", "MUL R0, R1", "PRN R0", "HLT"]);
}

#[test]
fn test_load_error_before_execution() {
    let err = parse_program("10000010\n00000000\nhello\n").unwrap_err();
    assert!(matches!(err.kind, LoadErrKind::Lex(LexErr::InvalidBinary)));
    assert_eq!(err.line(), Some(3));
}

#[test]
fn test_unknown_opcode_stops_execution() {
    let src = source(&[
        ("LDI R0,8", &[LDI, 0, 8]),
        ("PRN R0",   &[PRN, 0]),
        ("???",      &[0b1111_0000]),
        ("PRN R0",   &[PRN, 0]),
        ("HLT",      &[HLT]),
    ]);

    let (sim, result, output) = run(&src);
    assert_eq!(result, Err(SimErr::UnknownOpcode(0b1111_0000)));
    assert!(!sim.hit_halt());
    assert_eq!(sim.pc, 5);
    assert_eq!(output, [8]);
}

#[test]
fn test_missing_hlt_runs_into_zeroed_memory() {
    let (sim, result, _) = run("10000010\n00000000\n00001000\n");
    assert_eq!(result, Err(SimErr::UnknownOpcode(0)));
    assert_eq!(sim.pc, 3);
}

#[test]
fn test_channel_output() {
    let program = parse_program(MULT).unwrap();
    let (display, rx) = ChannelDisplay::unbounded();

    let mut sim = Simulator::new(Default::default());
    sim.set_output(display);
    sim.load_program(&program);
    sim.run().unwrap();

    assert_eq!(rx.try_iter().collect::<Vec<_>>(), [72]);
}

#[test]
fn test_seeded_memory() {
    let flags = SimFlags { machine_init: MachineInitStrategy::Seeded { seed: 2110 } };
    let program = Program::new(vec![LDI, 0, 8, MUL, 0, 0, PRN, 0, HLT]).unwrap();

    let mut a = Simulator::new(flags);
    let mut b = Simulator::new(flags);
    assert_eq!(a.mem, b.mem);

    let display = BufferedDisplay::default();
    a.set_output(display.clone());
    b.set_output(BufferedDisplay::default());
    a.load_program(&program);
    b.load_program(&program);
    a.run().unwrap();
    b.run().unwrap();

    assert_eq!(a.mem, b.mem);
    assert_eq!(&*display.get_buffer().read().unwrap(), &[64]);
}
