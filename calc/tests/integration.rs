use calc::{CalcError, Context, EvalError, Folders, RecordingBackend, Value, convert_string};
use rivet::{ParseErrorKind, RivetString, StringKind};

fn convert(kind: StringKind, source: &str, ctx: &mut Context) -> Result<Vec<String>, CalcError> {
    let string = RivetString::from_text(kind, "test", source);
    convert_string(&string, ctx, &mut RecordingBackend::new()).map(|f| f.lines().to_vec())
}

fn run(kind: StringKind, source: &str, ctx: &mut Context) -> Vec<String> {
    convert(kind, source, ctx).expect("conversion failed")
}

#[test]
fn footnotes_number_in_declaration_order_across_strings() {
    let mut ctx = Context::new();
    let first = run(
        StringKind::Repo,
        "    Steel per AISC[#]_ and bolts per RCSC[#]_.\n",
        &mut ctx,
    );
    assert_eq!(first, vec!["Steel per AISC[1] and bolts per RCSC[2]."]);

    let second = run(
        StringKind::Insert,
        "    [foot]_ see note 1\n    [foot]_ see note 2\n",
        &mut ctx,
    );
    assert_eq!(second, vec!["[1] see note 1", "[2] see note 2"]);
    assert!(ctx.state.footnote_queue.is_empty());
}

#[test]
fn values_persist_into_later_equations() {
    let mut ctx = Context::new();
    run(StringKind::Value, "    || values\n    x = 3.5 | test value\n\n", &mut ctx);
    assert_eq!(ctx.env.get("x"), Some(&Value::Scalar(3.5)));

    run(StringKind::Equation, "    y = 2*x | double\n", &mut ctx);
    assert_eq!(ctx.env.get("y"), Some(&Value::Scalar(7.0)));
}

#[test]
fn value_line_with_units() {
    let mut ctx = Context::new();
    let lines = run(StringKind::Value, "    x = 10.1 * IN | length of beam\n", &mut ctx);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("x = 10.100 in"));
    assert!(lines[0].ends_with("| length of beam"));
}

#[test]
fn rerendering_against_the_same_context_is_identical() {
    let source = "    [e]_ Bending\n    M = w*L^2/8 | moment\n";
    let mut base = Context::new();
    base.env.set("w", Value::Scalar(1.5), "");
    base.env.set("L", Value::Scalar(20.0), "");

    let mut a = base.clone();
    let mut b = base.clone();
    assert_eq!(run(StringKind::Equation, source, &mut a), run(StringKind::Equation, source, &mut b));
    assert_eq!(a.state, b.state);
}

#[test]
fn empty_strings_change_nothing() {
    let mut ctx = Context::new();
    let before = ctx.state.clone();
    assert!(run(StringKind::Repo, "", &mut ctx).is_empty());
    assert_eq!(ctx.state, before);
}

#[test]
fn unterminated_blocks_fail() {
    let mut ctx = Context::new();
    let err = convert(StringKind::Repo, "    || summary\n    body line", &mut ctx).unwrap_err();
    match err {
        CalcError::Parse(e) => {
            assert!(matches!(e.kind, ParseErrorKind::BlockNotClosed { .. }));
            assert_eq!(e.line, Some(0));
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn unknown_commands_name_the_kind() {
    let mut ctx = Context::new();
    let err = convert(StringKind::Value, "    || plot | t\n", &mut ctx).unwrap_err();
    assert!(matches!(
        err,
        CalcError::Parse(ref e) if matches!(e.kind, ParseErrorKind::UnknownCommand { kind: StringKind::Value, .. })
    ));
}

#[test]
fn csv_table_is_wrapped_to_the_requested_width() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("data.csv"),
        "member,remarks\n\
         B1,simply supported beam carrying the roof deck and mechanical units\n\
         B2,continuous over two spans\n\
         C1,\"axial load only, pinned at both ends\"\n",
    )
    .unwrap();
    let mut ctx = Context::new().with_folders(Folders::all(dir.path()));
    let lines = run(StringKind::Insert, "    || table | data.csv | 40\n    Members\n\n", &mut ctx);

    assert_eq!(lines[0], "Table 1.1  Members");
    let grid: Vec<&String> = lines.iter().filter(|l| l.starts_with('+') || l.starts_with('|')).collect();
    assert_eq!(grid.iter().filter(|l| l.starts_with("+=")).count(), 1);
    // header row plus three data rows, each closed by a border
    assert_eq!(grid.iter().filter(|l| l.starts_with("+-")).count(), 4);
    for line in grid.iter().filter(|l| l.starts_with('|')) {
        for cell in line.split('|').map(str::trim) {
            assert!(cell.chars().count() <= 40);
        }
    }
    assert!(lines.iter().any(|l| l.contains("simply supported beam")));
}

#[test]
fn right_and_center_tags_differ() {
    let mut ctx = Context::new();
    ctx.state.section_width = 30;
    let lines = run(StringKind::Repo, "    Title[r]_\n    Title[c]_\n", &mut ctx);
    assert_eq!(lines[0], format!("{}Title", " ".repeat(25)));
    assert_eq!(lines[1], format!("{}Title", " ".repeat(12)));
}

#[test]
fn a_failed_string_leaves_the_context_untouched() {
    let mut ctx = Context::new();
    run(StringKind::Value, "    a = 1\n", &mut ctx);
    let before_vars = ctx.env.len();
    let before_state = ctx.state.clone();

    let err = convert(
        StringKind::Equation,
        "    b = a + 1 | fine\n    c = nope * 2 | broken\n",
        &mut ctx,
    )
    .unwrap_err();
    assert!(matches!(err, CalcError::Evaluation { line: 1, .. }));
    assert_eq!(ctx.env.len(), before_vars);
    assert!(!ctx.env.contains("b"));
    assert_eq!(ctx.state, before_state);
}

#[test]
fn section_reset_restarts_equation_numbers() {
    let mut ctx = Context::new();
    ctx.state.section_width = 40;
    let first = run(StringKind::Equation, "    a = 1 | one\n", &mut ctx);
    assert!(first[0].ends_with("one [1.1]"));
    ctx.state.begin_section(2);
    let second = run(StringKind::Equation, "    b = 2 | two\n    c = 3 | three\n", &mut ctx);
    assert!(second[0].ends_with("two [2.1]"));
    assert!(second.iter().any(|l| l.ends_with("three [2.2]")));
}

#[test]
fn repo_labels_pad_short_rows() {
    let mut ctx = Context::new();
    let lines = run(
        StringKind::Repo,
        "    || labels\n    project, beam design, level 2\n    client, acme\n\n",
        &mut ctx,
    );
    assert_eq!(lines[1], "| category | label       | label   |");
    assert!(lines.iter().any(|l| l == "| client   | acme        | -       |"));
}

#[test]
fn table_strings_plot_through_the_backend() {
    let mut ctx = Context::new();
    let mut backend = RecordingBackend::new();
    let string = RivetString::from_text(
        StringKind::Table,
        "plots",
        "    || data | beam | x, m\n    || plot | beam | x:x, y:m, k:line\n    || save | beam.png | Moment diagram\n",
    );
    let out = convert_string(&string, &mut ctx, &mut backend).unwrap();
    assert_eq!(backend.exported.len(), 1);
    assert_eq!(out.lines()[0], "Figure 1.1  Moment diagram");
    assert!(ctx.plot.is_some());
}

#[test]
fn value_subheadings_pass_through_as_text() {
    let mut ctx = Context::new();
    let lines = run(
        StringKind::Value,
        "    Geometry:\n    x = 3.5 | test value\n    || values\n    Loads:\n    w = 2 | load\n\n",
        &mut ctx,
    );
    assert_eq!(lines[0], "Geometry:");
    assert_eq!(lines[2], "Loads:");
    assert_eq!(ctx.env.get("x"), Some(&Value::Scalar(3.5)));
    assert_eq!(ctx.env.get("w"), Some(&Value::Scalar(2.0)));
}

#[test]
fn runaway_unit_exponents_are_evaluation_errors() {
    let mut ctx = Context::new();
    let err = convert(StringKind::Equation, "    a = IN^64 | a\n    b = a*a | b\n", &mut ctx).unwrap_err();
    assert!(matches!(
        err,
        CalcError::Evaluation { line: 1, error: EvalError::TypeError { .. }, .. }
    ));

    let err = convert(StringKind::Equation, "    c = (IN^2)^64 | c\n", &mut ctx).unwrap_err();
    assert!(matches!(err, CalcError::Evaluation { line: 0, .. }));
}
