use crate::error::UnsupportedFormatError;
use crate::transpiler::{
    ArticyEmitter, Emitter, GodotEmitter, InkEmitter, UnityEmitter, UnrealEmitter, YarnEmitter,
};
use std::fmt;
use std::str::FromStr;

/// Identifiers of formats the editor lists but no serializer backs yet.
pub const PLANNED_FORMATS: [&str; 3] = ["twine", "renpy", "dialogic"];

/// The available export targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    /// inkle's Ink script: knots, stitches, choices and diverts.
    Ink,
    /// Yarn Spinner script: one node per block.
    Yarn,
    /// A Dialogue System for Unity database as JSON.
    Unity,
    /// A generic node/edge JSON document for a custom Godot interpreter.
    Godot,
    /// Unreal DataTable CSV files.
    Unreal,
    /// articy:draft-style XML.
    Articy,
}

/// The two generation strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatFamily {
    /// The graph is linearized into blocks of script.
    TextScript,
    /// The graph is serialized node for node.
    Structured,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 6] = [
        ExportFormat::Ink,
        ExportFormat::Yarn,
        ExportFormat::Unity,
        ExportFormat::Godot,
        ExportFormat::Unreal,
        ExportFormat::Articy,
    ];

    pub fn identifier(&self) -> &'static str {
        match self {
            ExportFormat::Ink => "ink",
            ExportFormat::Yarn => "yarn",
            ExportFormat::Unity => "unity",
            ExportFormat::Godot => "godot",
            ExportFormat::Unreal => "unreal",
            ExportFormat::Articy => "articy",
        }
    }

    pub fn family(&self) -> FormatFamily {
        match self {
            ExportFormat::Ink | ExportFormat::Yarn => FormatFamily::TextScript,
            ExportFormat::Unity
            | ExportFormat::Godot
            | ExportFormat::Unreal
            | ExportFormat::Articy => FormatFamily::Structured,
        }
    }

    /// The expression emitter bound to this target.
    pub fn emitter(&self) -> &'static dyn Emitter {
        match self {
            ExportFormat::Ink => &InkEmitter,
            ExportFormat::Yarn => &YarnEmitter,
            ExportFormat::Unity => &UnityEmitter,
            ExportFormat::Godot => &GodotEmitter,
            ExportFormat::Unreal => &UnrealEmitter,
            ExportFormat::Articy => &ArticyEmitter,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

impl FromStr for ExportFormat {
    type Err = UnsupportedFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        if let Some(format) = ExportFormat::ALL
            .iter()
            .find(|f| f.identifier() == normalized)
        {
            return Ok(*format);
        }
        if PLANNED_FORMATS.contains(&normalized.as_str()) {
            Err(UnsupportedFormatError::NotImplemented(s.to_string()))
        } else {
            Err(UnsupportedFormatError::Unregistered(s.to_string()))
        }
    }
}
