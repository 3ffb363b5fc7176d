//! Unit tests for the shared helpers, the AST and the format registry.
mod common;
use kataribe::helpers::{
    CsvTable, IdCounter, XmlWriter, escape_csv_field, escape_xml, neutralize_formula,
    sanitize_identifier, single_line, slugify, strip_html, truncate,
};
use kataribe::prelude::*;

#[test]
fn test_value_display() {
    assert_eq!(format!("{}", Value::Number(42.0)), "42");
    assert_eq!(format!("{}", Value::Number(-0.5)), "-0.5");
    assert_eq!(format!("{}", Value::Bool(true)), "true");
    assert_eq!(format!("{}", Value::Text("gold".to_string())), "gold");
    assert_eq!(format!("{}", Value::Null), "null");
    // Past the exact integer range the cast would saturate.
    assert_eq!(format!("{}", Value::Number(1e20)), "100000000000000000000");
    assert_eq!(format!("{}", Value::Number(-1e20)), "-100000000000000000000");
}

#[test]
fn test_sheet_index_keeps_first_duplicate() {
    let sheets = vec![Sheet {
        shortcut: "inv".to_string(),
        name: "Inventory".to_string(),
        variables: vec![
            VariableDefinition::new("gold", VariableKind::Number, Value::Number(1.0)),
            VariableDefinition::new("gold", VariableKind::Number, Value::Number(2.0)),
        ],
    }];
    let index = kataribe::flow::SheetIndex::new(&sheets);

    let resolved = index.resolve(&VariableRef::new("inv", "gold")).unwrap();
    assert_eq!(resolved.initial_value(), Value::Number(1.0));
    assert_eq!(index.variables().len(), 1);
    assert_eq!(index.variables()[0].initial_value(), Value::Number(1.0));
}

#[test]
fn test_value_deserializes_untagged() {
    assert_eq!(serde_json::from_str::<Value>("100").unwrap(), Value::Number(100.0));
    assert_eq!(serde_json::from_str::<Value>("false").unwrap(), Value::Bool(false));
    assert_eq!(
        serde_json::from_str::<Value>("\"Harbor\"").unwrap(),
        Value::Text("Harbor".to_string())
    );
    assert_eq!(serde_json::from_str::<Value>("null").unwrap(), Value::Null);
}

#[test]
fn test_operator_round_trips_through_names() {
    for op in Operator::ALL {
        assert_eq!(op.as_str().parse::<Operator>().unwrap(), op);
    }
    for op in Operation::ALL {
        assert_eq!(op.as_str().parse::<Operation>().unwrap(), op);
    }
    assert!("approximately".parse::<Operator>().is_err());
    assert!(Operator::IsNil.is_unary());
    assert!(!Operator::Contains.is_unary());
    assert!(Operation::SetIfUnset.takes_value());
    assert!(!Operation::Toggle.takes_value());
}

#[test]
fn test_expression_variables_include_operands() {
    let mut compare = common::rule("inv", "gold", Operator::GreaterThan, None);
    compare.value = Some(Operand::Variable(VariableRef::new("shop", "price")));
    let condition = Condition::new(Logic::All, vec![compare]);
    let names: Vec<String> = condition.variables().iter().map(|v| v.to_string()).collect();
    assert_eq!(names, vec!["inv.gold", "shop.price"]);
}

#[test]
fn test_format_registry() {
    assert_eq!("ink".parse::<ExportFormat>().unwrap(), ExportFormat::Ink);
    assert_eq!("ARTICY".parse::<ExportFormat>().unwrap(), ExportFormat::Articy);
    assert_eq!(ExportFormat::Unreal.to_string(), "unreal");
    assert_eq!(ExportFormat::Yarn.family(), FormatFamily::TextScript);
    assert_eq!(ExportFormat::Godot.family(), FormatFamily::Structured);
    assert_eq!(ExportFormat::Unity.emitter().target(), "unity");

    let identifiers: Vec<_> = ExportFormat::ALL.iter().map(|f| f.identifier()).collect();
    assert_eq!(
        identifiers,
        vec!["ink", "yarn", "unity", "godot", "unreal", "articy"]
    );
}

#[test]
fn test_strip_html() {
    assert_eq!(strip_html("<p>Hello <b>there</b></p>"), "Hello there");
    assert_eq!(strip_html("one<br>two<br/>three"), "one\ntwo\nthree");
    assert_eq!(strip_html("<p>A</p><p></p><p></p><p>B</p>"), "A\n\nB");
    assert_eq!(strip_html("Tom &amp; Jerry &lt;3"), "Tom & Jerry <3");
    assert_eq!(strip_html("&amp;lt;"), "&lt;");
    assert_eq!(strip_html("  lots   of\tspace  "), "lots of space");
    assert_eq!(strip_html("a < b"), "a < b");
    assert_eq!(strip_html(""), "");
}

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("exactly", 7), "exactly");
    assert_eq!(truncate("Hello world", 7), "Hello…");
    assert_eq!(truncate("日本語のテキスト", 4), "日本語…");
    assert_eq!(truncate("anything", 0), "");
}

#[test]
fn test_single_line() {
    assert_eq!(single_line("one\ntwo\r\n  three"), "one two three");
}

#[test]
fn test_sanitize_identifier() {
    assert_eq!(sanitize_identifier("Main Story"), "Main_Story");
    assert_eq!(sanitize_identifier("a--b  c"), "a_b_c");
    assert_eq!(sanitize_identifier("  trim me!  "), "trim_me");
    assert_eq!(sanitize_identifier("3 doors"), "_3_doors");
    assert_eq!(sanitize_identifier("???"), "unnamed");
    assert_eq!(slugify("Harbor Tales"), "harbor_tales");
}

#[test]
fn test_id_counter_is_per_instance() {
    let mut first = IdCounter::starting_at(1);
    let mut second = IdCounter::starting_at(1);
    assert_eq!(first.next_id(), 1);
    assert_eq!(first.next_id(), 2);
    assert_eq!(first.peek(), 3);
    assert_eq!(second.next_id(), 1);
}

#[test]
fn test_csv_escaping() {
    assert_eq!(escape_csv_field("plain"), "plain");
    assert_eq!(escape_csv_field("a,b"), "\"a,b\"");
    assert_eq!(escape_csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    assert_eq!(escape_csv_field("two\nlines"), "\"two\nlines\"");
    assert_eq!(escape_csv_field("=1+1"), "'=1+1");
    assert_eq!(escape_csv_field("=A1,B1"), "\"'=A1,B1\"");

    for trigger in ["=", "+", "-", "@", "\t", "\r"] {
        let value = format!("{}cmd", trigger);
        assert!(neutralize_formula(&value).starts_with('\''));
    }
    assert_eq!(neutralize_formula("safe"), "safe");
    assert_eq!(neutralize_formula(""), "");
}

#[test]
fn test_csv_table() {
    let mut table = CsvTable::new(&["Name", "Text", "Next"]);
    table.push_row(["a", "Hello, you"]);
    table.push_row(["b", "x", "y", "dropped"]);
    assert_eq!(
        table.finish(),
        "Name,Text,Next\r\na,\"Hello, you\",\r\nb,x,y\r\n"
    );
}

#[test]
fn test_xml_writer() {
    assert_eq!(
        escape_xml("<a href=\"x\">Tom & Jerry's</a>"),
        "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&apos;s&lt;/a&gt;"
    );
    assert_eq!(escape_xml("line\nbreak\u{1}"), "line&#10;break");

    let mut xml = XmlWriter::new();
    xml.open("Root", &[("Name", "a&b")]);
    xml.empty("Leaf", &[]);
    xml.text_element("Text", &[], "1 < 2");
    let doc = xml.finish();
    assert_eq!(
        doc,
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<Root Name=\"a&amp;b\">\n  <Leaf />\n  <Text>1 &lt; 2</Text>\n</Root>\n"
    );
}

#[test]
fn test_error_display() {
    let err = UnsupportedFormatError::Unregistered("dot".to_string());
    assert_eq!(err.to_string(), "Export format 'dot' is not registered");

    let err = TranspileError::UnsupportedOperation {
        operation: "clear".to_string(),
        target: "yarn".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "Operation 'clear' is not supported by the yarn emitter"
    );

    let err: ExportError = TraversalError::MissingEntry {
        flow_id: "intro".to_string(),
    }
    .into();
    assert_eq!(err.to_string(), "Flow 'intro' has no entry node");
}

#[test]
fn test_export_output_accessors() {
    let single = ExportOutput::Single(OutputFile::new("a.json", "{}"));
    assert_eq!(single.files().count(), 1);
    assert!(single.file("a.json").is_some());
    assert!(single.file("b.json").is_none());

    let many = ExportOutput::Files(vec![
        OutputFile::new("main.ink", ""),
        OutputFile::new("intro.ink", ""),
    ]);
    let names: Vec<_> = many
        .into_files()
        .into_iter()
        .map(|f| f.filename)
        .collect();
    assert_eq!(names, vec!["main.ink", "intro.ink"]);
}

#[test]
fn test_into_project() {
    struct Draft {
        title: String,
    }

    impl IntoProject for Draft {
        fn into_project(self) -> std::result::Result<Project, ProjectConversionError> {
            if self.title.is_empty() {
                return Err(ProjectConversionError::Invalid("missing title".to_string()));
            }
            Ok(Project {
                name: self.title,
                flows: vec![common::create_greeting_flow()],
                sheets: common::create_sheets(),
            })
        }
    }

    let project = Draft {
        title: "Draft".to_string(),
    }
    .into_project()
    .unwrap();
    assert!(Exporter::builder(project).build().export(ExportFormat::Godot).is_ok());

    let err = Draft {
        title: String::new(),
    }
    .into_project()
    .unwrap_err();
    assert_eq!(err.to_string(), "Invalid project data: missing title");
}
