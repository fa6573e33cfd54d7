//! A plain text format for meshes in the Lagrange basis.
//!
//! ```text
//! # LAGRANGIAN nodes=4 elements=1 type=quad
//! 0 0 0
//! 1 0 0
//! 0 1 0
//! 1 1 0
//! 0 1 2 3
//! ```
//!
//! The header is followed by one line of `x y z` per node and one line of 0-based node
//! indices per element. Element nodes are listed in tensor order, first direction fastest.
use crate::patch::{ElementId, LagrangePatch};
use eyre::{eyre, Context};
use itertools::zip_eq;
use lagpatch_nested_vec::NestedVec;
use nalgebra::Point3;
use std::io::Write;
use std::path::Path;

const HEADER_TAG: &str = "# LAGRANGIAN";

#[derive(Debug, Clone, PartialEq)]
pub struct LagrangeMesh {
    pub coordinates: Vec<Point3<f64>>,
    pub connectivity: NestedVec<usize>,
    pub cell_type: String,
}

impl LagrangeMesh {
    /// The nodes and regular elements of a patch. Zero-area elements are left out.
    pub fn from_patch(patch: &LagrangePatch) -> Self {
        let mut connectivity = NestedVec::new();
        for (nodes, id) in zip_eq(patch.connectivity().iter(), patch.element_ids()) {
            if *id != ElementId::ZeroArea {
                connectivity.push(nodes);
            }
        }
        Self {
            coordinates: patch.coordinates().to_vec(),
            connectivity,
            cell_type: "quad".to_string(),
        }
    }
}

pub fn write_lagrange<W: Write>(mesh: &LagrangeMesh, mut writer: W) -> eyre::Result<()> {
    writeln!(
        writer,
        "{HEADER_TAG} nodes={} elements={} type={}",
        mesh.coordinates.len(),
        mesh.connectivity.len(),
        mesh.cell_type
    )?;
    for x in &mesh.coordinates {
        writeln!(writer, "{} {} {}", x.x, x.y, x.z)?;
    }
    for nodes in mesh.connectivity.iter() {
        let line: Vec<String> = nodes.iter().map(usize::to_string).collect();
        writeln!(writer, "{}", line.join(" "))?;
    }
    Ok(())
}

pub fn save_lagrange_to_file<P: AsRef<Path>>(mesh: &LagrangeMesh, file_path: P) -> eyre::Result<()> {
    let file = std::fs::File::create(file_path).wrap_err("failed to create file")?;
    write_lagrange(mesh, std::io::BufWriter::new(file)).wrap_err("failed to write Lagrange mesh")
}

fn parse_header(line: &str) -> eyre::Result<(usize, usize, String)> {
    let fields = line
        .strip_prefix(HEADER_TAG)
        .ok_or_else(|| eyre!("missing '{HEADER_TAG}' header"))?;

    let (mut nodes, mut elements, mut cell_type) = (None, None, None);
    for field in fields.split_whitespace() {
        let (key, value) = field
            .split_once('=')
            .ok_or_else(|| eyre!("malformed header field '{field}'"))?;
        match key {
            "nodes" => nodes = Some(value.parse::<usize>().wrap_err("invalid node count")?),
            "elements" => elements = Some(value.parse::<usize>().wrap_err("invalid element count")?),
            "type" => cell_type = Some(value.to_string()),
            _ => {}
        }
    }

    Ok((
        nodes.ok_or_else(|| eyre!("header lacks node count"))?,
        elements.ok_or_else(|| eyre!("header lacks element count"))?,
        cell_type.unwrap_or_else(|| "quad".to_string()),
    ))
}

/// Parses a mesh in the Lagrange basis text format.
pub fn parse_lagrange(text: &str) -> eyre::Result<LagrangeMesh> {
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());
    let header = lines.next().ok_or_else(|| eyre!("empty Lagrange mesh"))?;
    let (num_nodes, num_elements, cell_type) = parse_header(header.trim())?;

    let mut coordinates = Vec::with_capacity(num_nodes);
    for node in 0..num_nodes {
        let line = lines
            .next()
            .ok_or_else(|| eyre!("expected {num_nodes} nodes, found {node}"))?;
        let values = line
            .split_whitespace()
            .map(str::parse::<f64>)
            .collect::<Result<Vec<_>, _>>()
            .wrap_err_with(|| format!("invalid coordinates of node {node}"))?;
        let point = match values.as_slice() {
            [x, y] => Point3::new(*x, *y, 0.0),
            [x, y, z] => Point3::new(*x, *y, *z),
            _ => return Err(eyre!("node {node} has {} coordinates", values.len())),
        };
        coordinates.push(point);
    }

    let mut connectivity = NestedVec::with_capacity(num_elements, 0);
    for element in 0..num_elements {
        let line = lines
            .next()
            .ok_or_else(|| eyre!("expected {num_elements} elements, found {element}"))?;
        let nodes = line
            .split_whitespace()
            .map(str::parse::<usize>)
            .collect::<Result<Vec<_>, _>>()
            .wrap_err_with(|| format!("invalid connectivity of element {element}"))?;
        if let Some(&node) = nodes.iter().find(|&&node| node >= num_nodes) {
            return Err(eyre!("element {element} refers to node {node} of {num_nodes}"));
        }
        connectivity.push(&nodes);
    }

    Ok(LagrangeMesh {
        coordinates,
        connectivity,
        cell_type,
    })
}

pub fn load_lagrange_from_file<P: AsRef<Path>>(file_path: P) -> eyre::Result<LagrangeMesh> {
    let text = std::fs::read_to_string(file_path).wrap_err("failed to read file")?;
    parse_lagrange(&text).wrap_err("failed to parse Lagrange mesh")
}

impl LagrangePatch {
    /// Writes the nodes and elements of the patch in the Lagrange basis text format.
    pub fn write_basis<W: Write>(&self, writer: W) -> eyre::Result<()> {
        write_lagrange(&LagrangeMesh::from_patch(self), writer)
    }
}
