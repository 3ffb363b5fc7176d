use std::fmt;

/// Stable name of a block, derived from the id of the node that anchors it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(String);

impl BlockId {
    pub(crate) fn new(id: String) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a node starts its own block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockAnchor {
    Entry,
    Dialogue,
    Hub,
    /// A non-dialogue node reached from more than one predecessor.
    Convergence,
}

impl BlockAnchor {
    pub(crate) fn prefix(&self) -> &'static str {
        match self {
            BlockAnchor::Entry => "entry",
            BlockAnchor::Dialogue => "dlg",
            BlockAnchor::Hub => "hub",
            BlockAnchor::Convergence => "node",
        }
    }
}

/// One line of linearized script. Conditions and actions are already
/// rendered in the target's syntax.
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Text {
        speaker: Option<String>,
        text: String,
    },
    Direction(String),
    Choice {
        text: String,
        condition: Option<String>,
        body: Vec<Line>,
    },
    Conditional {
        condition: String,
        then: Vec<Line>,
        otherwise: Vec<Line>,
    },
    Action(String),
    Scene {
        location: Option<String>,
        description: String,
    },
    /// Run another flow and come back.
    Call {
        flow_id: String,
    },
    Divert(BlockId),
    End,
}

impl Line {
    /// Whether control never falls through past this line.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Line::Divert(_) | Line::End)
    }
}

#[derive(Debug, Clone)]
pub struct Block {
    pub id: BlockId,
    pub node_id: String,
    pub anchor: BlockAnchor,
    pub lines: Vec<Line>,
}

/// The ordered block sequence of one flow. `blocks[0]` is the entry block.
#[derive(Debug, Clone)]
pub struct LinearFlow {
    pub flow_id: String,
    pub flow_name: String,
    pub blocks: Vec<Block>,
}

impl LinearFlow {
    pub fn block(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| &b.id == id)
    }

    pub fn entry(&self) -> Option<&Block> {
        self.blocks.first()
    }

    /// Every divert target in the flow, in emission order, including nested ones.
    pub fn divert_targets(&self) -> Vec<&BlockId> {
        fn collect<'a>(lines: &'a [Line], out: &mut Vec<&'a BlockId>) {
            for line in lines {
                match line {
                    Line::Divert(id) => out.push(id),
                    Line::Choice { body, .. } => collect(body, out),
                    Line::Conditional {
                        then, otherwise, ..
                    } => {
                        collect(then, out);
                        collect(otherwise, out);
                    }
                    _ => {}
                }
            }
        }
        let mut out = Vec::new();
        for block in &self.blocks {
            collect(&block.lines, &mut out);
        }
        out
    }
}
