use super::{run, translate};
use crate::interpreter::execute;
use crate::memory::DEFAULT_MEMORY_SIZE;
use crate::sm::{Cell, Opcode, Program};

#[test]
fn sum_assignment() {
    let program = translate("x = 5 + 10;");
    assert_eq!(
        program.code(),
        &[
            Cell::Opcode(Opcode::Lit),
            Cell::Address(1),
            Cell::Opcode(Opcode::Lit),
            Cell::Int(5),
            Cell::Opcode(Opcode::Lit),
            Cell::Int(10),
            Cell::Opcode(Opcode::Add),
            Cell::Opcode(Opcode::Sti),
            Cell::Opcode(Opcode::Quit),
        ]
    );

    let memory = run("x = 5 + 10;", &[], &[], 0);
    assert_eq!(memory.load(1), Ok(&Cell::Int(15)));
}

#[test]
fn squares() {
    run(
        "
        i = 0;
        :loop: put i * i;
        i = i + 1;
        if i < 6 then goto loop;
        ",
        &[],
        &["0", "1", "4", "9", "16", "25"],
        0,
    );
}

#[test]
fn precedence_and_associativity() {
    run(
        "put 2 + 3 * 4, (2 + 3) * 4, -5 + 2, 7 / 2, 10 - 3 - 2, +4;",
        &[],
        &["14", "20", "-3", "3", "5", "4"],
        0,
    );
}

#[test]
fn relational_operators() {
    run(
        "
        if 3 >= 3 then put 1;
        if 3 <> 4 then put 2;
        if 2 > 3 then put 3;
        if 5 = 5 then put 4;
        if 4 <= 3 then put 5;
        if 2 < 3 then put 6;
        ",
        &[],
        &["1", "2", "4", "6"],
        0,
    );
}

#[test]
fn reverse_input() {
    run(
        "
        declare a(6);
        i = 0;
        :fill: i = i + 1; get a(i);
        if i < 6 then goto fill;
        :dump: put a(i); i = i - 1;
        if i > 0 then goto dump;
        ",
        &["1", "2", "3", "4", "5", "6"],
        &["6", "5", "4", "3", "2", "1"],
        6,
    );
}

#[test]
fn selection_sort() {
    run(
        "
        declare a(5);
        n = 5;
        i = 1;
        :read: get a(i);
        i = i + 1;
        if i <= n then goto read;

        i = 1;
        :outer: j = i + 1;
        :inner: if a(j) < a(i) then do;
            t = a(i);
            a(i) = a(j);
            a(j) = t;
        end;
        j = j + 1;
        if j <= n then goto inner;
        i = i + 1;
        if i < n then goto outer;

        i = 1;
        :write: put a(i);
        i = i + 1;
        if i <= n then goto write;
        ",
        &["8", "5", "9", "1", "7"],
        &["1", "5", "7", "8", "9"],
        5,
    );
}

#[test]
fn array_cells_round_trip() {
    let memory = run(
        "
        declare a(5);
        i = 0;
        :fill: a(i) = i * 10; i = i + 1;
        if i < 5 then goto fill;
        i = 0;
        :dump: put a(i); i = i + 1;
        if i < 5 then goto dump;
        ",
        &[],
        &["0", "10", "20", "30", "40"],
        0,
    );

    assert_eq!(
        &memory.cells()[..6],
        &[
            Cell::Int(0),
            Cell::Int(10),
            Cell::Int(20),
            Cell::Int(30),
            Cell::Int(40),
            Cell::Uninitialized,
        ]
    );
    assert_eq!(memory.load(7), Ok(&Cell::Int(5)));
}

#[test]
fn forward_goto_skips_code() {
    let memory = run("goto skip; put 1; :skip: put 2;", &[], &["2"], 0);
    // the label cell holds the index right after `goto` and `put 1`
    assert_eq!(memory.load(1), Ok(&Cell::Address(8)));
}

#[test]
fn stop_halts() {
    run("put 1; stop; put 2;", &[], &["1"], 0);
}

#[test]
fn groups_run_all_statements() {
    run(
        "x = 1; if x = 1 then do; put 1; put 2; end; put 3;",
        &[],
        &["1", "2", "3"],
        0,
    );
}

#[test]
fn reals_and_texts_from_input() {
    run(
        "get x, y; put x * 2, y;",
        &["1.5", "word"],
        &["3.0", "word"],
        2,
    );
}

#[test]
fn addresses_follow_first_reference() {
    let scheme = crate::grammar::Grammar::plh().unwrap();
    let translation = crate::interpreter::compile(
        &scheme,
        "declare a(2), b(3); x = 1; :here: c = x;",
        None,
    )
    .unwrap();

    let address = |name: &str| translation.symbols.get(name).map(|s| s.address);
    // 1 + sum of the sizes of everything referenced before
    assert_eq!(address("a"), Some(1));
    assert_eq!(address("b"), Some(4));
    assert_eq!(address("x"), Some(8));
    assert_eq!(address("here"), Some(9));
    assert_eq!(address("c"), Some(10));
}

#[test]
fn saved_program_runs_the_same() {
    let source = "declare a(2); a(1) = 4; put a(1) * a(1);";
    let dir = std::env::temp_dir().join(format!("plh-regression-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let (code, data) = (dir.join("codefile"), dir.join("datafile"));

    translate(source).save(&code, Some(data.as_path())).unwrap();
    let loaded = Program::load(&code, Some(data.as_path())).unwrap();
    // addresses come back as plain integers
    assert_eq!(loaded.code().len(), translate(source).code().len());
    assert_eq!(loaded.data().cells(), &[Cell::Uninitialized, Cell::Uninitialized, Cell::Uninitialized]);

    let mut input: Vec<String> = Vec::new();
    let mut output: Vec<String> = Vec::new();
    execute(&loaded, DEFAULT_MEMORY_SIZE, &mut input, &mut output, None).unwrap();
    assert_eq!(output, vec!["16"]);

    std::fs::remove_dir_all(&dir).unwrap();
}
