use dsm85::annot::AnnotationMap;
use dsm85::config::Config;
use dsm85::dis::disassemble;
use dsm85::parse::parse_str;

//===========================================================================//

fn listing(image: &[u8], annotations: &str, config: Config) -> String {
    let mut info = AnnotationMap::new();
    if !annotations.is_empty() {
        parse_str(annotations, "test.txt", &mut info).unwrap();
    }
    disassemble(&config, image, &mut info)
}

fn plain(image: &[u8]) -> String {
    listing(image, "", Config::default())
}

//===========================================================================//

#[test]
fn single_nop() {
    assert_eq!(plain(&[0x00]), "        NOP\n");
}

#[test]
fn branch_gets_a_label() {
    assert_eq!(
        plain(&[0xc3, 0x03, 0x00, 0x76]),
        "        JMP j0003\n\
         j0003: HLT\n"
    );
}

#[test]
fn interrupt_vector_labels() {
    let config = Config { hw_labels: true, ..Config::default() };
    let text = listing(&[0u8; 9], "", config);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 9);
    assert_eq!(lines[0], "rst0:  NOP");
    for line in &lines[1..8] {
        assert_eq!(*line, "        NOP");
    }
    assert_eq!(lines[8], "rst1:  NOP");
}

#[test]
fn data_bytes_merge_onto_one_line() {
    let text = listing(
        &[0x01, 0x02, 0x03, 0x04, 0x05],
        "labels:\n 0 bytes data\n",
        Config::default(),
    );
    assert_eq!(text, "data:  DB $01,$02,$03,$04,$05\n");
}

#[test]
fn label_boundary_demotes_instruction() {
    let text = listing(
        &[0xcd, 0x04, 0x00, 0x00, 0x00],
        "labels:\n 2 entry\n",
        Config::default(),
    );
    assert_eq!(
        text,
        "        DB $cd,$04\n\
         entry: NOP\n        NOP\n        NOP\n"
    );
}

#[test]
fn address_column() {
    let config = Config { address_column: true, ..Config::default() };
    assert_eq!(listing(&[0x76], "", config), "$0000    HLT\n");
}

#[test]
fn blank_line_after_ret() {
    assert_eq!(plain(&[0xc9, 0x00]), "        RET\n\n        NOP\n");
}

#[test]
fn conditional_return_gets_no_blank_line() {
    assert_eq!(plain(&[0xc8, 0x00]), "        RZ\n        NOP\n");
}

#[test]
fn eight_data_items_per_line() {
    let image: Vec<u8> = (0x10..0x1a).collect();
    let text =
        listing(&image, "labels:\n 0..9 bytes tbl\n", Config::default());
    assert_eq!(
        text,
        "tbl:   DB $10,$11,$12,$13,$14,$15,$16,$17\n\
         \x20       DB $18,$19\n"
    );
}

#[test]
fn text_runs_concatenate_without_limit() {
    let text = listing(
        b"Hello, world",
        "labels:\n 0..11 text msg\n",
        Config::default(),
    );
    assert_eq!(text, "msg:   DT Hello, world\n");
}

#[test]
fn word_regions_little_and_big_endian() {
    let text = listing(
        &[0x34, 0x12, 0x12, 0x34],
        "labels:\n 0..1 dwords_le a\n 2..3 dwords_be b\n",
        Config::default(),
    );
    assert_eq!(
        text,
        "a:     DW $1234\n\
         b:     DW $1234\n"
    );
}

#[test]
fn segment_banners() {
    let text = listing(
        &[0x00, 0x00, 0x00, 0x00, 0x01, 0x02, 0x03, 0x04],
        "segments:\n $0..$3 rom\n $4..$7 bytes data\n",
        Config::default(),
    );
    assert_eq!(
        text,
        "\n\n=== Start of rom ===\n\
         \x20       NOP\n\
         \x20       NOP\n\
         \x20       NOP\n\
         \x20       NOP\n\
         \n=== End of rom ===\n\
         \n\n=== Start of data ===\n\
         \x20       DB $01,$02,$03,$04\n\
         \n=== End of data ===\n"
    );
}

#[test]
fn comment_ends_a_merged_line() {
    let text = listing(
        &[0x01, 0x02, 0x03, 0x04],
        "labels:\n 0..3 bytes d\ncomments:\n $1 \"boundary\"\n",
        Config::default(),
    );
    assert_eq!(
        text,
        "d:     DB $01,$02    ;boundary\n\
         \x20       DB $03,$04\n"
    );
}

#[test]
fn comment_on_an_instruction_line() {
    let text = listing(
        &[0x00, 0x76],
        "comments:\n 1 \"stop here\"\n",
        Config::default(),
    );
    assert_eq!(
        text,
        "        NOP\n\
         \x20       HLT    ;stop here\n"
    );
}

#[test]
fn comment_boundary_demotes_instruction() {
    // The operand byte of the JMP carries a comment, so the JMP cannot
    // consume it.
    let text = listing(
        &[0xc3, 0x00, 0x00],
        "comments:\n 1 \"patched\"\n",
        Config::default(),
    );
    assert_eq!(
        text,
        "        DB $c3\n\
         \x20       NOP    ;patched\n\
         \x20       NOP\n"
    );
}

#[test]
fn immediate_operands() {
    assert_eq!(plain(&[0x3e, 0x42]), "        MVI A,#42\n");
    assert_eq!(plain(&[0xd3, 0x10]), "        OUT #10\n");
}

#[test]
fn address_operand_without_label() {
    assert_eq!(plain(&[0x32, 0x00, 0x20]), "        STA $2000\n");
}

#[test]
fn hybrid_operand_with_and_without_label() {
    assert_eq!(plain(&[0x21, 0x34, 0x12]), "        LXI H,#1234\n");
    let text = listing(
        &[0x21, 0x34, 0x12],
        "labels:\n $1234 buffer\n",
        Config::default(),
    );
    assert_eq!(text, "        LXI H,buffer(#1234)\n");
}

#[test]
fn range_label_operand_gets_an_index() {
    let text = listing(
        &[0x3a, 0x01, 0x10, 0x01, 0x02],
        "labels:\n $3..$4 bytes tab\n $1000..$1003 buf\n",
        Config::default(),
    );
    assert_eq!(
        text,
        "        LDA buf[1]\n\
         tab:   DB $01,$02\n"
    );
}

#[test]
fn long_label_goes_on_its_own_line() {
    let text =
        listing(&[0x00], "labels:\n 0 longlabel1\n", Config::default());
    assert_eq!(text, "longlabel1:\n            NOP\n");
}

#[test]
fn long_label_with_address_column() {
    let config = Config { address_column: true, ..Config::default() };
    let text = listing(&[0x00], "labels:\n 0 longlabel1\n", config);
    assert_eq!(text, "$0000    longlabel1:\n                 NOP\n");
}

#[test]
fn seven_character_label_fills_the_field() {
    let text = listing(&[0x00], "labels:\n 0 advance\n", Config::default());
    assert_eq!(text, "advance:NOP\n");
}

#[test]
fn base_address_in_listing() {
    let config = Config {
        base_address: 0x8000,
        address_column: true,
        ..Config::default()
    };
    let text = listing(&[0xc3, 0x00, 0x80], "", config);
    assert_eq!(text, "$8000    j8000: JMP j8000\n");
}

#[test]
fn every_branch_operand_has_a_label() {
    // Branch targets inside and outside the image all get labels.
    let mut info = AnnotationMap::new();
    let config = Config::default();
    let image = [0xc3, 0x06, 0x00, 0xcd, 0x00, 0x20, 0xc9];
    let lines = dsm85::dis::scan(&config, &image, &mut info);
    for line in &lines {
        if line.instruction.is_branch() && line.instruction.operand_length > 0
        {
            assert!(
                info.label_at(u32::from(line.operand)),
                "no label at {:#06x}",
                line.operand
            );
        }
    }
}

#[test]
fn ret_table_listing() {
    let mut info = AnnotationMap::new();
    info.add_indirect_label("vec", 0, 2);
    info.set_data_type(4, 0x10000, dsm85::annot::DataType::Code);
    let config = Config::default();
    let image = [0x04, 0x00, 0x05, 0x00, 0x76, 0x76];
    let text = disassemble(&config, &image, &mut info);
    assert_eq!(
        text,
        "vec:   DW $0004,$0005\n\
         vec[0]:HLT\n\
         vec[1]:HLT\n"
    );
}
