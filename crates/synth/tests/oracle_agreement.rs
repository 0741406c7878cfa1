//! Every generated block must print exactly what it declares when run on the
//! reference simulator.

use rand::rngs::StdRng;
use rand::SeedableRng;
use veighty_config::{FlagPolarity, SynthConfig};
use veighty_isa::{OpCode, OpcodeTable, Program};
use veighty_synth::generators::{
    add_block, compare_with, strcat_block, sub_block, Comparison, Operands, BASIC_BLOCKS,
    BRANCH_BLOCKS,
};
use veighty_synth::{Block, Corpus, GenContext, ProgramShape, Simulator, Synthesizer};

const DRAWS: usize = 120;

fn fixtures() -> (OpcodeTable, Corpus) {
    (OpcodeTable::bundled().unwrap(), Corpus::bundled().unwrap())
}

fn settings(polarity: FlagPolarity) -> SynthConfig {
    SynthConfig {
        compare_flag: polarity,
        ..SynthConfig::default()
    }
}

/// Runs `block` from offset zero and compares against its declared stream.
fn assert_block_agrees(table: &OpcodeTable, polarity: FlagPolarity, block: Block, label: &str) {
    let program = Program::from(block);
    let mut sim = Simulator::new(table, polarity);
    let output = sim
        .run(&program.encode(), &program.input_stream())
        .unwrap_or_else(|e| panic!("{label}: simulator fault {e}\n{program}"));
    assert_eq!(
        String::from_utf8_lossy(&output),
        String::from_utf8_lossy(&program.expected_stream()),
        "{label}\n{program}"
    );
}

#[test]
fn basic_blocks_match_simulation() {
    let (table, corpus) = fixtures();
    let settings = settings(FlagPolarity::Direct);
    let mut rng = StdRng::seed_from_u64(0xb10c);
    let mut ctx = GenContext::new(&table, &corpus, &settings, &mut rng);
    for generator in BASIC_BLOCKS {
        for _ in 0..DRAWS {
            let block = (generator.generate)(&mut ctx).unwrap();
            assert_block_agrees(&table, FlagPolarity::Direct, block, generator.name);
        }
    }
}

#[test]
fn branch_blocks_match_simulation_under_both_polarities() {
    let (table, corpus) = fixtures();
    for polarity in [FlagPolarity::Direct, FlagPolarity::Inverted] {
        let settings = settings(polarity);
        let mut rng = StdRng::seed_from_u64(0xb4a9c);
        let mut ctx = GenContext::new(&table, &corpus, &settings, &mut rng);
        for generator in BRANCH_BLOCKS {
            // (comparison held, jz chosen) pairs drawn for this generator
            let mut seen = [[false; 2]; 2];
            for _ in 0..DRAWS {
                let branch = (generator.generate)(&mut ctx, 0).unwrap();
                assert_eq!(branch.target, branch.jump_end + branch.offset);
                assert!((1..=30).contains(&branch.offset));
                if branch.comparison.is_some() {
                    let jz = branch.jump == OpCode::Jz;
                    let flag = polarity.flag_for(branch.holds);
                    assert_eq!(branch.taken, if jz { !flag } else { flag }, "{}", generator.name);
                    seen[branch.holds as usize][jz as usize] = true;
                }
                assert_block_agrees(&table, polarity, branch.block, generator.name);
            }
            if generator.name != "jmp" {
                assert_eq!(seen, [[true; 2]; 2], "{} under {polarity}", generator.name);
            }
        }
    }
}

#[test]
fn constant_folding_covers_every_combination() {
    let (table, corpus) = fixtures();
    let settings = settings(FlagPolarity::Direct);
    let mut rng = StdRng::seed_from_u64(31);
    let mut ctx = GenContext::new(&table, &corpus, &settings, &mut rng);
    for comparison in Comparison::ALL {
        let mut seen = [[false; 2]; 2];
        for draw in 0..DRAWS {
            let holds = draw % 2 == 0;
            let jump = if draw % 4 < 2 { OpCode::Jz } else { OpCode::Jnz };
            let operands = match (comparison, holds) {
                (Comparison::Less, true) => Operands::Int { v1: 3, v2: 9 },
                (Comparison::Less, false) => Operands::Int { v1: 9, v2: 3 },
                (Comparison::Greater, true) => Operands::Int { v1: 9, v2: 3 },
                (Comparison::Greater, false) => Operands::Int { v1: 3, v2: 3 },
                (Comparison::Equal, true) => Operands::Int { v1: 5, v2: 5 },
                (Comparison::Equal, false) => Operands::Int { v1: 5, v2: 6 },
                (Comparison::StrEqual, true) => Operands::Str {
                    v1: b"semaphore".to_vec(),
                    v2: b"semaphore".to_vec(),
                },
                (Comparison::StrEqual, false) => Operands::Str {
                    v1: b"semaphore".to_vec(),
                    v2: b"telegraph".to_vec(),
                },
                (Comparison::Substring, true) => Operands::Str {
                    v1: b"lighthouse".to_vec(),
                    v2: b"thou".to_vec(),
                },
                (Comparison::Substring, false) => Operands::Str {
                    v1: b"lighthouse".to_vec(),
                    v2: b"windmill".to_vec(),
                },
            };
            let position = draw * 7;
            let branch = compare_with(&mut ctx, position, comparison, operands, jump).unwrap();
            assert_eq!(branch.holds, holds);
            let expected_taken = (jump == OpCode::Jz) != holds;
            assert_eq!(branch.taken, expected_taken, "{comparison:?} {jump}");
            if branch.taken {
                assert_eq!(position + branch.block.encoded_len(), branch.target);
            }
            seen[holds as usize][(jump == OpCode::Jz) as usize] = true;
        }
        assert_eq!(seen, [[true; 2]; 2], "{comparison:?}");
    }
}

#[test]
fn composed_programs_match_simulation() {
    let (table, corpus) = fixtures();
    for polarity in [FlagPolarity::Direct, FlagPolarity::Inverted] {
        let synth = Synthesizer::new(&table, &corpus, settings(polarity));
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..100 {
            for shape in [ProgramShape::Linear, ProgramShape::Branching] {
                let program = synth.generate(shape, &mut rng).unwrap();
                assert!(program.encoded_len() < 4096);
                let mut sim = Simulator::new(&table, polarity);
                let output = sim
                    .run(&program.encode(), &program.input_stream())
                    .unwrap_or_else(|e| panic!("{shape}: {e}\n{program}"));
                assert_eq!(output, program.expected_stream(), "{shape}\n{program}");
            }
        }
    }
}

#[test]
fn scenario_add() {
    let (table, corpus) = fixtures();
    let settings = settings(FlagPolarity::Direct);
    let mut rng = StdRng::seed_from_u64(1);
    let mut ctx = GenContext::new(&table, &corpus, &settings, &mut rng);
    let block = add_block(&mut ctx, 5, 7).unwrap();
    let ops: Vec<_> = block.instructions().iter().map(|i| i.op()).collect();
    assert!(matches!(ops[0], Some(OpCode::Push | OpCode::Read)));
    assert_eq!(ops[2], Some(OpCode::Add));
    assert_eq!(ops[3], Some(OpCode::Pop));
    let first = &block.instructions()[0];
    let pushed = first.input().unwrap_or_else(|| first.payload());
    assert_eq!(pushed, &7u64.to_le_bytes()[..]);
    assert_eq!(block.expected_outputs().collect::<Vec<_>>(), vec![&b"0xc"[..]]);
}

#[test]
fn scenario_sub() {
    let (table, corpus) = fixtures();
    let settings = settings(FlagPolarity::Direct);
    let mut rng = StdRng::seed_from_u64(2);
    let mut ctx = GenContext::new(&table, &corpus, &settings, &mut rng);
    let block = sub_block(&mut ctx, 10, 3).unwrap();
    assert_eq!(block.instructions()[2].op(), Some(OpCode::Sub));
    assert_eq!(block.expected_outputs().collect::<Vec<_>>(), vec![&b"0x7"[..]]);
    assert!(sub_block(&mut ctx, 3, 10).is_err());
}

#[test]
fn scenario_strcat() {
    let (table, corpus) = fixtures();
    let settings = settings(FlagPolarity::Direct);
    let mut rng = StdRng::seed_from_u64(3);
    let mut ctx = GenContext::new(&table, &corpus, &settings, &mut rng);
    let block = strcat_block(&mut ctx, b"ab".to_vec(), b"cd".to_vec()).unwrap();
    let first = &block.instructions()[0];
    let pushed = match first.op() {
        Some(OpCode::Pushs) => first.payload()[1..].to_vec(),
        _ => first.input().unwrap().strip_suffix(b"\n").unwrap().to_vec(),
    };
    assert_eq!(pushed, b"cd".to_vec());
    assert_eq!(block.instructions()[2].op(), Some(OpCode::Strcat));
    assert_eq!(block.expected_outputs().collect::<Vec<_>>(), vec![&b"abcd"[..]]);
    assert_block_agrees(&table, FlagPolarity::Direct, block, "strcat");
}

#[test]
fn scenario_less_than_falls_through() {
    let (table, corpus) = fixtures();
    let settings = settings(FlagPolarity::Direct);
    let mut rng = StdRng::seed_from_u64(4);
    let mut ctx = GenContext::new(&table, &corpus, &settings, &mut rng);
    let branch = compare_with(
        &mut ctx,
        0,
        Comparison::Less,
        Operands::Int { v1: 3, v2: 9 },
        OpCode::Jz,
    )
    .unwrap();
    assert!(branch.holds);
    assert!(!branch.taken);
    // push, push, lt, jz, then a whole basic block
    assert!(branch.block.len() > 4);
    assert!(branch.block.instructions()[4..].iter().all(|i| i.op().is_some()));
}
