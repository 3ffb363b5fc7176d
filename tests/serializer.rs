//! End-to-end exports through the public `Exporter` for every target.
mod common;
use common::*;
use kataribe::prelude::*;
use serde_json::Value as Json;

fn export(project: Project, format: ExportFormat) -> ExportOutput {
    Exporter::builder(project).build().export(format).unwrap()
}

fn content<'a>(output: &'a ExportOutput, filename: &str) -> &'a str {
    output
        .file(filename)
        .unwrap_or_else(|| panic!("missing output file {}", filename))
        .content
        .as_str()
}

fn parse_json(output: &ExportOutput, filename: &str) -> Json {
    serde_json::from_str(content(output, filename)).unwrap()
}

#[test]
fn test_greeting_to_ink() {
    let output = export(create_greeting_project(), ExportFormat::Ink);

    let names: Vec<_> = output.files().map(|f| f.filename.as_str()).collect();
    assert_eq!(names, vec!["main.ink", "intro.ink"]);

    assert_eq!(
        content(&output, "main.ink"),
        "// Demo\n\nINCLUDE intro.ink\n\n-> intro\n"
    );
    assert_eq!(
        content(&output, "intro.ink"),
        "=== intro ===\n-> intro.dlg_hello\n\n= dlg_hello\nHello\n* [Bye] -> END\n"
    );
}

#[test]
fn test_greeting_to_yarn() {
    let output = export(create_greeting_project(), ExportFormat::Yarn);

    assert_eq!(
        content(&output, "variables.yarn"),
        "title: Variables\n---\n===\n"
    );
    assert_eq!(
        content(&output, "intro.yarn"),
        "title: intro_entry_start\ntags: Intro\n---\n<<jump intro_dlg_hello>>\n===\n\n\
         title: intro_dlg_hello\n---\nHello\n-> Bye\n    <<stop>>\n===\n"
    );
}

#[test]
fn test_ink_declares_variables_and_renders_every_node() {
    let output = export(create_full_project(), ExportFormat::Ink);

    let main = content(&output, "main.ink");
    assert!(main.starts_with("// Harbor Tales\n"));
    assert!(main.contains("VAR inv_gold = 0\n"));
    assert!(main.contains("VAR inv_has_key = false\n"));
    assert!(main.contains("VAR inv_title = \"\"\n"));
    // The flow named "main" must not overwrite the root file.
    assert!(main.contains("INCLUDE main_2.ink\nINCLUDE shop.ink\n"));
    assert!(main.ends_with("-> main\n"));

    let flow = content(&output, "main_2.ink");
    assert!(flow.starts_with("=== main ===\n"));
    assert!(flow.contains("# scene: Harbor\nGulls & rain.\n"));
    assert!(flow.contains("~ inv_gold += 10\n"));
    assert!(flow.contains(
        "{ inv_gold >= 100:\n    -> main.dlg_rich\n- else:\n    -> main.dlg_poor\n}\n"
    ));
    assert!(flow.contains("= dlg_rich\nMara: Welcome, patron!\n-> main.node_call\n"));
    assert!(flow.contains("= node_call\n-> shop ->\n-> END\n"));

    let shop = content(&output, "shop.ink");
    assert!(shop.contains(
        "Mara: Anything else?\n* {inv_has_key == false} [Buy a key]\n    ~ inv_gold -= 5\n    ~ inv_has_key = true\n    ->->\n* [No, thanks] ->->\n"
    ));
    // The shop is only ever entered as a tunnel.
    assert!(!shop.contains("-> END"));
}

/// `town`: entry, a call into `shop`, then a dialogue after the call. `shop` is a one-line flow.
fn create_errand_project() -> Project {
    let town = FlowGraph {
        id: "town".to_string(),
        name: "Town".to_string(),
        nodes: vec![
            FlowNode::new("start", NodeData::Entry),
            FlowNode::new(
                "call",
                NodeData::Subflow(SubflowData {
                    flow_ref: "shop".to_string(),
                }),
            ),
            dialogue("after", None, "After the shop", vec![]),
            exit("end"),
        ],
        connections: vec![
            Connection::new("start", "output", "call"),
            Connection::new("call", "output", "after"),
            Connection::new("after", "output", "end"),
        ],
    };
    let shop = FlowGraph {
        id: "shop".to_string(),
        name: "Shop".to_string(),
        nodes: vec![
            FlowNode::new("start", NodeData::Entry),
            dialogue("inside", None, "In the shop", vec![]),
            exit("done"),
        ],
        connections: vec![
            Connection::new("start", "output", "inside"),
            Connection::new("inside", "output", "done"),
        ],
    };
    Project {
        name: "Errand".to_string(),
        flows: vec![town, shop],
        sheets: Vec::new(),
    }
}

#[test]
fn test_ink_called_flow_returns_to_caller() {
    let output = export(create_errand_project(), ExportFormat::Ink);

    let town = content(&output, "town.ink");
    assert!(town.contains("-> shop ->\n-> town.dlg_after\n"));
    assert!(town.contains("= dlg_after\nAfter the shop\n-> END\n"));

    let shop = content(&output, "shop.ink");
    assert!(shop.contains("In the shop\n->->\n"));
    assert!(!shop.contains("-> END"));

    assert!(content(&output, "main.ink").ends_with("-> town\n"));
}

#[test]
fn test_ink_enters_called_first_flow_as_tunnel() {
    let mut project = create_errand_project();
    project.flows.reverse();
    let output = export(project, ExportFormat::Ink);

    assert!(content(&output, "main.ink").ends_with("\n-> shop ->\n-> END\n"));
}

#[test]
fn test_yarn_called_flow_returns_to_caller() {
    let output = export(create_errand_project(), ExportFormat::Yarn);

    let town = content(&output, "town.yarn");
    assert!(town.contains("<<detour shop_entry_start>>\n<<jump town_dlg_after>>\n"));
    assert!(town.contains("title: town_dlg_after\n---\nAfter the shop\n<<stop>>\n"));

    let shop = content(&output, "shop.yarn");
    assert!(shop.contains("In the shop\n<<return>>\n"));
    assert!(!shop.contains("<<stop>>"));
}

/// Two greeting flows whose ids differ only in a separator.
fn create_lookalike_project() -> Project {
    let mut first = create_greeting_flow();
    first.id = "intro-1".to_string();
    let mut second = create_greeting_flow();
    second.id = "intro_1".to_string();
    Project {
        name: "Lookalikes".to_string(),
        flows: vec![first, second],
        sheets: Vec::new(),
    }
}

#[test]
fn test_ink_knots_stay_distinct() {
    let output = export(create_lookalike_project(), ExportFormat::Ink);
    let names: Vec<_> = output.files().map(|f| f.filename.as_str()).collect();
    assert_eq!(names, vec!["main.ink", "intro_1.ink", "intro_1_2.ink"]);

    let first = content(&output, "intro_1.ink");
    assert!(first.starts_with("=== intro_1 ===\n-> intro_1.dlg_hello\n"));
    let second = content(&output, "intro_1_2.ink");
    assert!(second.starts_with("=== intro_1_2 ===\n-> intro_1_2.dlg_hello\n"));
}

#[test]
fn test_yarn_titles_stay_distinct() {
    let output = export(create_lookalike_project(), ExportFormat::Yarn);

    let first = content(&output, "intro_1.yarn");
    assert!(first.starts_with("title: intro_1_entry_start\n"));
    assert!(first.contains("<<jump intro_1_dlg_hello>>\n"));

    let second = content(&output, "intro_1_2.yarn");
    assert!(second.starts_with("title: intro_1_entry_start_2\n"));
    assert!(second.contains("<<jump intro_1_dlg_hello_2>>\n"));
    assert!(second.contains("title: intro_1_dlg_hello_2\n"));
}

#[test]
fn test_ink_hub_loop_diverts_back() {
    let project = Project {
        name: "Loop".to_string(),
        flows: vec![create_hub_loop_flow()],
        sheets: create_sheets(),
    };
    let output = export(project, ExportFormat::Ink);
    let market = content(&output, "market.ink");

    assert!(market.contains("= hub_h1\n-> market.dlg_menu\n"));
    assert!(market.contains("* [Look around] -> market.hub_h1\n"));
    assert!(market.contains("* [Leave] -> END\n"));
    assert_eq!(market.matches("= hub_h1").count(), 1);
}

#[test]
fn test_ink_escapes_markup_in_text() {
    let mut project = create_greeting_project();
    let NodeData::Dialogue(hello) = &mut project.flows[0].nodes[1].data else {
        panic!("expected a dialogue node");
    };
    hello.text = "- {bold} # tag".to_string();

    let output = export(project, ExportFormat::Ink);
    assert!(content(&output, "intro.ink").contains("\\- \\{bold\\} \\# tag\n"));
}

#[test]
fn test_ink_escapes_comments_diverts_and_glue() {
    let mut project = create_greeting_project();
    project.sheets = vec![Sheet {
        shortcut: "odd".to_string(),
        name: "A//B".to_string(),
        variables: vec![],
    }];
    let NodeData::Dialogue(hello) = &mut project.flows[0].nodes[1].data else {
        panic!("expected a dialogue node");
    };
    hello.speaker = Some("odd".to_string());
    hello.text = "Visit http://x.io -> now <> glue".to_string();

    let output = export(project, ExportFormat::Ink);
    assert!(
        content(&output, "intro.ink")
            .contains("A\\//B: Visit http:\\//x.io \\-> now \\<> glue\n")
    );
}

#[test]
fn test_include_comments() {
    let output = Exporter::builder(create_greeting_project())
        .include_comments(true)
        .build()
        .export(ExportFormat::Ink)
        .unwrap();
    let intro = content(&output, "intro.ink");
    assert!(intro.contains("=== intro ===\n// Intro\n// node start\n"));
    assert!(intro.contains("= dlg_hello\n// node hello\n"));
}

#[test]
fn test_yarn_structure() {
    let output = export(create_full_project(), ExportFormat::Yarn);

    let variables = content(&output, "variables.yarn");
    assert!(variables.contains("<<declare $inv_gold = 0>>\n"));
    assert!(variables.contains("<<declare $inv_has_key = false>>\n"));

    let main = content(&output, "main.yarn");
    assert!(main.starts_with("title: main_entry_start\ntags: Main_Story\n---\n"));
    assert!(main.contains("<<scene Harbor>>\n"));
    assert!(main.contains("<<set $inv_gold to $inv_gold + 10>>\n"));
    assert!(main.contains("<<if $inv_gold >= 100>>\n    <<jump main_dlg_rich>>\n<<else>>\n    <<jump main_dlg_poor>>\n<<endif>>\n"));
    assert!(main.contains("title: main_node_call\n---\n<<detour shop_entry_start>>\n<<stop>>\n===\n"));

    let shop = content(&output, "shop.yarn");
    assert!(shop.contains("-> Buy a key <<if $inv_has_key == false>>\n"));
    assert!(shop.contains("<<return>>\n"));
    assert!(!shop.contains("<<stop>>"));
}

#[test]
fn test_unity_database() {
    let output = export(create_full_project(), ExportFormat::Unity);
    let names: Vec<_> = output.files().map(|f| f.filename.as_str()).collect();
    assert_eq!(names, vec!["harbor_tales.json"]);
    let db = parse_json(&output, "harbor_tales.json");

    assert_eq!(db["title"], "Harbor Tales");
    let actors = db["actors"].as_array().unwrap();
    assert_eq!(actors.len(), 2);
    assert_eq!(actors[0]["name"], "Player");
    assert_eq!(actors[0]["isPlayer"], true);
    assert_eq!(actors[1]["name"], "Mara");

    let variables = db["variables"].as_array().unwrap();
    assert_eq!(variables[0]["name"], "inv.gold");
    assert_eq!(variables[0]["type"], "Number");
    assert_eq!(variables[1]["type"], "Boolean");

    let conversations = db["conversations"].as_array().unwrap();
    assert_eq!(conversations.len(), 2);
    assert_eq!(conversations[0]["id"], 1);
    assert_eq!(conversations[1]["id"], 2);

    let entries = conversations[0]["dialogueEntries"].as_array().unwrap();
    let start = &entries[0];
    assert_eq!(start["id"], 0);
    assert_eq!(start["title"], "START");
    assert_eq!(start["isRoot"], true);

    let by_source = |source: &str| {
        entries
            .iter()
            .filter(|e| e["sourceNodeId"] == source)
            .collect::<Vec<_>>()
    };

    let branch = by_source("check");
    assert_eq!(branch.len(), 2);
    assert_eq!(branch[0]["conditionsString"], "Variable[\"inv.gold\"] >= 100");
    assert_eq!(
        branch[1]["conditionsString"],
        "not (Variable[\"inv.gold\"] >= 100)"
    );

    let scene = by_source("scene");
    assert_eq!(scene[0]["sequence"], "LoadLevel(Harbor)");

    let call = by_source("call");
    let links = call[0]["outgoingLinks"].as_array().unwrap();
    assert!(links.iter().any(|l| l["isConnector"] == true
        && l["destinationConversationId"] == 2
        && l["destinationDialogueId"] == 0));

    // Every link points at an entry of its destination conversation.
    for conversation in conversations {
        for entry in conversation["dialogueEntries"].as_array().unwrap() {
            for link in entry["outgoingLinks"].as_array().unwrap() {
                let target = conversations
                    .iter()
                    .find(|c| c["id"] == link["destinationConversationId"])
                    .unwrap();
                assert!(
                    target["dialogueEntries"]
                        .as_array()
                        .unwrap()
                        .iter()
                        .any(|e| e["id"] == link["destinationDialogueId"])
                );
            }
        }
    }
}

#[test]
fn test_godot_document() {
    let output = export(create_full_project(), ExportFormat::Godot);
    let doc = parse_json(&output, "harbor_tales.json");

    assert_eq!(doc["format"], "kataribe-godot");
    assert_eq!(doc["version"], 1);
    assert_eq!(doc["variables"][0]["name"], "inv.gold");

    let main = &doc["flows"][0];
    assert_eq!(main["id"], "main");
    assert_eq!(main["start"], 1);

    let nodes = main["nodes"].as_array().unwrap();
    let node = |source: &str| {
        nodes
            .iter()
            .find(|n| n["source_id"] == source)
            .unwrap()
            .clone()
    };
    let check = node("check");
    assert_eq!(check["type"], "condition");
    assert_eq!(check["condition"], "inv.gold >= 100");
    assert_eq!(check["true_next"], node("rich")["id"]);
    assert_eq!(check["false_next"], node("poor")["id"]);
    assert!(check["next"].is_null());

    let rich = node("rich");
    assert_eq!(rich["speaker_name"], "Mara");
    assert_eq!(rich["text"], "Welcome, patron!");
    assert_eq!(rich["next"], node("call")["id"]);

    // Ids are unique across flows.
    let shop_ids: Vec<_> = doc["flows"][1]["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["id"].as_u64().unwrap())
        .collect();
    assert_eq!(shop_ids, vec![9, 10, 11]);

    let offer = doc["flows"][1]["nodes"][1].clone();
    assert_eq!(offer["responses"][0]["condition"], "inv.has_key == false");
    assert_eq!(offer["responses"][0]["next"], 11);
    assert!(offer["responses"][1]["instruction"].is_null());
}

#[test]
fn test_godot_jump_points_at_hub() {
    let project = Project {
        name: "Loop".to_string(),
        flows: vec![create_hub_loop_flow()],
        sheets: create_sheets(),
    };
    let output = export(project, ExportFormat::Godot);
    let doc = parse_json(&output, "loop.json");
    let nodes = doc["flows"][0]["nodes"].as_array().unwrap();

    let hub = nodes.iter().find(|n| n["type"] == "hub").unwrap();
    let jump = nodes.iter().find(|n| n["type"] == "jump").unwrap();
    assert_eq!(jump["next"], hub["id"]);
    assert_eq!(jump["target_hub"], "market");
}

#[test]
fn test_unreal_tables() {
    let output = export(create_full_project(), ExportFormat::Unreal);
    let names: Vec<_> = output.files().map(|f| f.filename.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "DT_DialogueLines.csv",
            "DT_DialogueResponses.csv",
            "DT_Variables.csv"
        ]
    );

    let lines = content(&output, "DT_DialogueLines.csv");
    assert!(lines.starts_with(
        "Name,FlowId,NodeId,NodeType,Speaker,Text,StageDirections,Location,Subflow,Condition,Action,Next,NextOnFalse,Description\r\n"
    ));
    let check = [
        "main_check",
        "main",
        "check",
        "condition",
        "",
        "",
        "",
        "",
        "",
        "inv.gold >= 100",
        "",
        "main_rich",
        "main_poor",
        "",
    ]
    .join(",");
    assert!(lines.contains(&format!("{}\r\n", check)));
    let pay = [
        "main_pay",
        "main",
        "pay",
        "instruction",
        "",
        "",
        "",
        "",
        "",
        "",
        "inv.gold = inv.gold + 10;",
        "main_check",
        "",
        "",
    ]
    .join(",");
    assert!(lines.contains(&format!("{}\r\n", pay)));

    let responses = content(&output, "DT_DialogueResponses.csv");
    assert!(responses.contains(
        "shop_offer_buy,shop_offer,buy,0,Buy a key,inv.has_key == false,\"inv.gold = inv.gold - 5;\ninv.has_key = true;\",shop_done\r\n"
    ));
    assert!(responses.contains("shop_offer_no,shop_offer,no,1,\"No, thanks\",,,shop_done\r\n"));

    let variables = content(&output, "DT_Variables.csv");
    assert!(variables.contains("inv.gold,inv,gold,number,0,Inventory / gold\r\n"));
    assert!(variables.contains("inv.title,inv,title,text,,Inventory / title\r\n"));
}

#[test]
fn test_unreal_neutralizes_formulas() {
    let mut project = create_greeting_project();
    let NodeData::Dialogue(hello) = &mut project.flows[0].nodes[1].data else {
        panic!("expected a dialogue node");
    };
    hello.text = "=HYPERLINK(\"http://evil\")".to_string();
    hello.responses[0].text = "@SUM(A1)".to_string();

    let output = export(project, ExportFormat::Unreal);
    let lines = content(&output, "DT_DialogueLines.csv");
    assert!(lines.contains(",\"'=HYPERLINK(\"\"http://evil\"\")\","));
    assert!(!lines.contains(",=HYPERLINK"));

    let responses = content(&output, "DT_DialogueResponses.csv");
    assert!(responses.contains(",'@SUM(A1),"));
}

#[test]
fn test_articy_document() {
    let output = export(create_full_project(), ExportFormat::Articy);
    let xml = content(&output, "harbor_tales.xml");

    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<ArticyData Version=\"1\">\n"));
    assert!(xml.contains("<Project Name=\"Harbor Tales\" TechnicalName=\"harbor_tales\" />"));
    assert!(xml.contains("<Namespace Name=\"inv\" Description=\"Inventory\">"));
    assert!(xml.contains(
        "<Variable Name=\"gold\" Type=\"Integer\" Value=\"0\" Description=\"Inventory / gold\" />"
    ));
    assert!(xml.contains(
        "<Entity Id=\"0x0100000000000001\" TechnicalName=\"mara\" DisplayName=\"Mara\" />"
    ));
    assert!(xml.contains("<FlowFragment Id=\"0x"));
    assert!(xml.contains("TechnicalName=\"main\" DisplayName=\"Main Story\">"));
    assert!(xml.contains("<Expression>inv.gold &gt;= 100</Expression>"));
    assert!(xml.contains("<Text>Welcome, patron!</Text>"));
    assert!(xml.trim_end().ends_with("</ArticyData>"));

    // Every connection references ids declared as objects or pins.
    for line in xml.lines().filter(|l| l.trim_start().starts_with("<Connection ")) {
        for attr in ["Source=\"", "Target=\""] {
            let start = line.find(attr).unwrap() + attr.len();
            let id = &line[start..start + 18];
            assert!(xml.contains(&format!("Id=\"{}\"", id)), "unknown id {}", id);
        }
    }
}

#[test]
fn test_articy_rounds_fractional_defaults() {
    let mut project = create_greeting_project();
    project.sheets = vec![Sheet {
        shortcut: "inv".to_string(),
        name: "Inventory".to_string(),
        variables: vec![VariableDefinition::new(
            "weight",
            VariableKind::Number,
            Value::Number(1.5),
        )],
    }];

    let output = export(project, ExportFormat::Articy);
    assert!(content(&output, "demo.xml").contains(
        "<Variable Name=\"weight\" Type=\"Integer\" Value=\"2\" Description=\"Inventory / weight\" />"
    ));
}

#[test]
fn test_every_format_is_deterministic() {
    for format in ExportFormat::ALL {
        let first = export(create_full_project(), format);
        let second = export(create_full_project(), format);
        assert_eq!(first, second, "format {} is not deterministic", format);
    }
}

#[test]
fn test_only_flows_scopes_output() {
    let output = Exporter::builder(create_full_project())
        .only_flows(["shop"])
        .build()
        .export(ExportFormat::Yarn)
        .unwrap();
    let names: Vec<_> = output.files().map(|f| f.filename.as_str()).collect();
    assert_eq!(names, vec!["variables.yarn", "shop.yarn"]);
}

#[test]
fn test_export_named() {
    let exporter = Exporter::builder(create_greeting_project()).build();
    assert!(exporter.export_named("INK").is_ok());

    let err = exporter.export_named("twine").unwrap_err();
    assert!(matches!(
        err,
        ExportError::UnsupportedFormat(UnsupportedFormatError::NotImplemented(_))
    ));
    let err = exporter.export_named("dot").unwrap_err();
    assert!(matches!(
        err,
        ExportError::UnsupportedFormat(UnsupportedFormatError::Unregistered(ref name)) if name == "dot"
    ));
}

#[test]
fn test_subflow_outside_scope_blocks_export() {
    let err = Exporter::builder(create_full_project())
        .only_flows(["main"])
        .build()
        .export(ExportFormat::Godot)
        .unwrap_err();
    let ExportError::Validation(validation) = err else {
        panic!("expected a validation error, got {:?}", err);
    };
    assert!(
        validation
            .issues
            .iter()
            .any(|i| i.kind == IssueKind::UnknownSubflow { flow_ref: "shop".to_string() })
    );
}
