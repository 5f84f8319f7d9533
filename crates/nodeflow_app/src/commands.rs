// SPDX-License-Identifier: MIT OR Apache-2.0
//! Subcommand implementations.

use nodeflow_graph::graphs::calculator::{
    calculator_registry, set_input_value, OP_NODE_INPUT, OP_NODE_MUL, OP_NODE_OUTPUT,
};
use nodeflow_graph::{EdgeError, EditorSettings, NodeId, NodeState, Scene, SceneError};
use std::path::{Path, PathBuf};

/// Error type for the command line driver
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Settings file could not be read
    #[error("Failed to load settings {}: {source}", path.display())]
    Settings {
        /// Settings path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Scene error
    #[error(transparent)]
    Scene(#[from] SceneError),

    /// Edge rejected while building a scene
    #[error(transparent)]
    Edge(#[from] EdgeError),

    /// The node does not exist or holds no constant
    #[error("Node {0} is not an input node")]
    NotAnInput(u64),

    /// A node lacks the socket an edge was meant to use
    #[error("Node {node} has no {direction} socket {index}")]
    MissingSocket {
        /// Node id
        node: u64,
        /// "input" or "output"
        direction: &'static str,
        /// Socket index
        index: usize,
    },
}

/// Result type for commands
pub type Result<T> = std::result::Result<T, AppError>;

/// Settings from `path`, or the defaults
pub fn load_settings(path: Option<&Path>) -> Result<EditorSettings> {
    match path {
        Some(path) => EditorSettings::load(path).map_err(|source| AppError::Settings {
            path: path.to_path_buf(),
            source,
        }),
        None => Ok(EditorSettings::default()),
    }
}

fn new_scene(settings: &EditorSettings) -> Scene {
    Scene::with_settings(calculator_registry(), settings)
}

fn link(scene: &mut Scene, settings: &EditorSettings, from: NodeId, to: NodeId, input: usize) -> Result<()> {
    let output = scene
        .node(from)
        .and_then(|n| n.output(0))
        .map(|s| s.id)
        .ok_or(AppError::MissingSocket {
            node: from.0,
            direction: "output",
            index: 0,
        })?;
    let target = scene
        .node(to)
        .and_then(|n| n.input(input))
        .map(|s| s.id)
        .ok_or(AppError::MissingSocket {
            node: to.0,
            direction: "input",
            index: input,
        })?;
    scene.connect(output, target, settings.default_edge_type)?;
    Ok(())
}

/// Build the example scene and save it
pub fn demo(settings: &EditorSettings, out: &Path) -> Result<()> {
    let mut scene = new_scene(settings);
    let a = scene.spawn(OP_NODE_INPUT, egui::pos2(-350.0, -250.0))?;
    let b = scene.spawn(OP_NODE_INPUT, egui::pos2(-350.0, 0.0))?;
    let mul = scene.spawn(OP_NODE_MUL, egui::pos2(-75.0, -125.0))?;
    let result = scene.spawn(OP_NODE_OUTPUT, egui::pos2(200.0, -125.0))?;

    set_input_value(&mut scene, a, 5.0);
    set_input_value(&mut scene, b, 2.0);
    link(&mut scene, settings, a, mul, 0)?;
    link(&mut scene, settings, b, mul, 1)?;
    link(&mut scene, settings, mul, result, 0)?;

    scene.save_to_file(out)?;
    print_scene(&scene);
    Ok(())
}

/// Load a scene and print the result of every output node
pub fn eval(settings: &EditorSettings, file: &Path) -> Result<()> {
    let mut scene = new_scene(settings);
    scene.load_from_file(file)?;
    for line in output_results(&scene) {
        println!("{line}");
    }
    Ok(())
}

/// Change one input constant and save
pub fn set(settings: &EditorSettings, file: &Path, node: u64, value: f64, output: Option<&Path>) -> Result<()> {
    let mut scene = new_scene(settings);
    scene.load_from_file(file)?;
    if !set_input_value(&mut scene, NodeId(node), value) {
        return Err(AppError::NotAnInput(node));
    }
    scene.save_to_file(output.unwrap_or(file))?;
    print_scene(&scene);
    Ok(())
}

/// Print every registered node type
pub fn list_nodes() {
    for kind in calculator_registry().kinds() {
        println!(
            "{:>3}  {:<10} {:?}  {}",
            kind.op_code(),
            kind.name,
            kind.category,
            kind.description
        );
    }
}

/// One line per output node: id and result text, or why it has none
fn output_results(scene: &Scene) -> Vec<String> {
    scene
        .nodes()
        .filter(|node| node.is_output())
        .map(|node| match node.diagnostic() {
            Some(diagnostic) if node.state() == NodeState::Invalid => {
                format!("#{} {}: {diagnostic}", node.id.0, node.title)
            }
            _ => format!("#{} {}", node.id.0, node.text()),
        })
        .collect()
}

fn print_scene(scene: &Scene) {
    for node in scene.nodes() {
        let state = match node.state() {
            NodeState::Clean => "ok",
            NodeState::Dirty => "dirty",
            NodeState::Invalid => "invalid",
        };
        let detail = if node.is_output() {
            node.text().to_string()
        } else {
            node.display_value()
        };
        print!("#{:<4} {:<10} {:<8} {}", node.id.0, node.title, state, detail);
        match node.diagnostic() {
            Some(diagnostic) => println!("  ({diagnostic})"),
            None => println!(),
        }
    }
    println!("{} nodes, {} edges", scene.node_count(), scene.edge_count());
}
