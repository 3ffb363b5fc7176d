//! Common test utilities for building projects, flows and expressions.
use kataribe::prelude::*;

/// A rule comparing `sheet.variable` against a literal.
#[allow(dead_code)]
pub fn rule(sheet: &str, variable: &str, operator: Operator, value: Option<Value>) -> Rule {
    Rule {
        variable: VariableRef::new(sheet, variable),
        operator,
        value: value.map(Operand::Literal),
    }
}

/// An assignment writing a literal to `sheet.variable`.
#[allow(dead_code)]
pub fn assign(sheet: &str, variable: &str, operation: Operation, value: Option<Value>) -> Assignment {
    Assignment {
        variable: VariableRef::new(sheet, variable),
        operation,
        value: value.map(Operand::Literal),
    }
}

#[allow(dead_code)]
pub fn dialogue(id: &str, speaker: Option<&str>, text: &str, responses: Vec<Response>) -> FlowNode {
    FlowNode::new(
        id,
        NodeData::Dialogue(DialogueData {
            speaker: speaker.map(str::to_string),
            text: text.to_string(),
            responses,
            ..Default::default()
        }),
    )
}

#[allow(dead_code)]
pub fn exit(id: &str) -> FlowNode {
    FlowNode::new(id, NodeData::Exit(ExitData::default()))
}

#[allow(dead_code)]
pub fn hub(id: &str, hub_id: &str) -> FlowNode {
    FlowNode::new(
        id,
        NodeData::Hub(HubData {
            hub_id: hub_id.to_string(),
        }),
    )
}

#[allow(dead_code)]
pub fn jump(id: &str, target_hub: &str) -> FlowNode {
    FlowNode::new(
        id,
        NodeData::Jump(JumpData {
            target_hub: target_hub.to_string(),
        }),
    )
}

/// The `inv` sheet with three variables, and `mara`, a speaker without variables.
#[allow(dead_code)]
pub fn create_sheets() -> Vec<Sheet> {
    vec![
        Sheet {
            shortcut: "inv".to_string(),
            name: "Inventory".to_string(),
            variables: vec![
                VariableDefinition::new("gold", VariableKind::Number, Value::Number(0.0)),
                VariableDefinition::new("has_key", VariableKind::Boolean, Value::Bool(false)),
                VariableDefinition::new("title", VariableKind::Text, Value::Null),
            ],
        },
        Sheet {
            shortcut: "mara".to_string(),
            name: "Mara".to_string(),
            variables: vec![],
        },
    ]
}

/// `entry → dialogue("Hello", [Bye]) → exit`.
#[allow(dead_code)]
pub fn create_greeting_flow() -> FlowGraph {
    FlowGraph {
        id: "intro".to_string(),
        name: "Intro".to_string(),
        nodes: vec![
            FlowNode::new("start", NodeData::Entry),
            dialogue("hello", None, "Hello", vec![Response::new("bye", "Bye")]),
            exit("end"),
        ],
        connections: vec![
            Connection::new("start", "output", "hello"),
            Connection::new("hello", "bye", "end"),
        ],
    }
}

#[allow(dead_code)]
pub fn create_greeting_project() -> Project {
    Project {
        name: "Demo".to_string(),
        flows: vec![create_greeting_flow()],
        sheets: Vec::new(),
    }
}

/// A market loop: the `again` response jumps back to the hub.
///
/// `entry → hub(market) → dialogue(menu, [again, leave])`, `again → jump(market)`, `leave → exit`.
#[allow(dead_code)]
pub fn create_hub_loop_flow() -> FlowGraph {
    FlowGraph {
        id: "market".to_string(),
        name: "Market".to_string(),
        nodes: vec![
            FlowNode::new("start", NodeData::Entry),
            hub("h1", "market"),
            dialogue(
                "menu",
                Some("mara"),
                "What now?",
                vec![Response::new("again", "Look around"), Response::new("leave", "Leave")],
            ),
            jump("j1", "market"),
            exit("end"),
        ],
        connections: vec![
            Connection::new("start", "output", "h1"),
            Connection::new("h1", "output", "menu"),
            Connection::new("menu", "again", "j1"),
            Connection::new("menu", "leave", "end"),
        ],
    }
}

/// A flow using every node kind, plus a second flow it calls as a subflow.
///
/// `entry → scene → instruction(gold += 10) → condition(gold >= 100)`;
/// the true branch reaches the `rich` dialogue, the false branch `poor`.
/// Both continue to the `shop` subflow and then to the exit.
#[allow(dead_code)]
pub fn create_full_project() -> Project {
    let main = FlowGraph {
        id: "main".to_string(),
        name: "Main Story".to_string(),
        nodes: vec![
            FlowNode::new("start", NodeData::Entry),
            FlowNode::new(
                "scene",
                NodeData::Scene(SceneData {
                    location: Some("Harbor".to_string()),
                    description: "<p>Gulls &amp; rain.</p>".to_string(),
                }),
            ),
            FlowNode::new(
                "pay",
                NodeData::Instruction(Instruction::new(vec![assign(
                    "inv",
                    "gold",
                    Operation::Add,
                    Some(Value::Number(10.0)),
                )])),
            ),
            FlowNode::new(
                "check",
                NodeData::Condition(Condition::new(
                    Logic::All,
                    vec![rule(
                        "inv",
                        "gold",
                        Operator::GreaterThanOrEqual,
                        Some(Value::Number(100.0)),
                    )],
                )),
            ),
            dialogue("rich", Some("mara"), "<b>Welcome</b>, patron!", vec![]),
            dialogue("poor", Some("mara"), "Come back later.", vec![]),
            FlowNode::new(
                "call",
                NodeData::Subflow(SubflowData {
                    flow_ref: "shop".to_string(),
                }),
            ),
            exit("end"),
        ],
        connections: vec![
            Connection::new("start", "output", "scene"),
            Connection::new("scene", "output", "pay"),
            Connection::new("pay", "output", "check"),
            Connection::new("check", "true", "rich"),
            Connection::new("check", "false", "poor"),
            Connection::new("rich", "output", "call"),
            Connection::new("poor", "output", "call"),
            Connection::new("call", "output", "end"),
        ],
    };

    let mut buy = Response::new("buy", "Buy a key");
    buy.condition = Some(Condition::new(
        Logic::All,
        vec![rule("inv", "has_key", Operator::IsFalse, None)],
    ));
    buy.instruction = Some(Instruction::new(vec![
        assign("inv", "gold", Operation::Subtract, Some(Value::Number(5.0))),
        assign("inv", "has_key", Operation::SetTrue, None),
    ]));

    let shop = FlowGraph {
        id: "shop".to_string(),
        name: "Shop".to_string(),
        nodes: vec![
            FlowNode::new("start", NodeData::Entry),
            dialogue(
                "offer",
                Some("mara"),
                "Anything else?",
                vec![buy, Response::new("no", "No, thanks")],
            ),
            exit("done"),
        ],
        connections: vec![
            Connection::new("start", "output", "offer"),
            Connection::new("offer", "buy", "done"),
            Connection::new("offer", "no", "done"),
        ],
    };

    Project {
        name: "Harbor Tales".to_string(),
        flows: vec![main, shop],
        sheets: create_sheets(),
    }
}
