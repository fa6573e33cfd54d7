//! Export of visualization grids to legacy VTK files.
use crate::patch::ElementBlock;
use eyre::{eyre, Context};
use std::convert::TryInto;
use std::path::Path;
use vtkio::model::{
    Attribute, Attributes, ByteOrder, CellType, Cells, DataSet, Piece, UnstructuredGridPiece, Version, VertexNumbers,
    Vtk,
};

/// Builds VTK data sets from an [`ElementBlock`].
pub struct ElementBlockDataSetBuilder<'a> {
    block: &'a ElementBlock,
    // Only used for exporting directly to file
    title: Option<String>,
}

impl<'a> ElementBlockDataSetBuilder<'a> {
    pub fn from_block(block: &'a ElementBlock) -> Self {
        Self { block, title: None }
    }

    pub fn with_title(self, title: impl Into<String>) -> Self {
        Self {
            block: self.block,
            title: Some(title.into()),
        }
    }

    /// An unstructured grid of quads with the owning element ids as cell data.
    pub fn try_build(&self) -> eyre::Result<DataSet> {
        let points: Vec<f64> = self
            .block
            .points()
            .iter()
            .flat_map(|x| [x.x, x.y, x.z])
            .collect();

        // Vertices is laid out as follows: N, i_1, i_2, ... i_N
        let mut vertices: Vec<u32> = Vec::with_capacity(5 * self.block.num_cells());
        for cell in self.block.cells() {
            vertices.push(4);
            for &idx in cell {
                vertices.push(
                    idx.try_into()
                        .map_err(|_| eyre!("vertex index {idx} does not fit in VTK index type"))?,
                );
            }
        }
        let num_cells = self
            .block
            .num_cells()
            .try_into()
            .wrap_err("too many cells for VTK")?;

        let element_ids: Vec<u64> = self.block.element_ids().iter().map(|&id| id as u64).collect();
        let piece = UnstructuredGridPiece {
            points: points.into(),
            cells: Cells {
                cell_verts: VertexNumbers::Legacy { num_cells, vertices },
                types: vec![CellType::Quad; self.block.num_cells()],
            },
            data: Attributes {
                point: Vec::new(),
                cell: vec![Attribute::scalars("element", 1).with_data(element_ids)],
            },
        };

        Ok(DataSet::UnstructuredGrid {
            meta: None,
            pieces: vec![Piece::Inline(Box::new(piece))],
        })
    }

    /// Convenience function for directly exporting the dataset to a file.
    pub fn try_export(&self, filename: impl AsRef<Path>) -> eyre::Result<()> {
        let filepath = filename.as_ref();
        let fallback_title = filepath
            .file_stem()
            .map(|os_str| os_str.to_string_lossy().to_string())
            .unwrap_or_else(|| "untitled".to_string());
        let dataset = self.try_build()?;
        if let Some(dir) = filepath.parent() {
            std::fs::create_dir_all(dir).wrap_err_with(|| format!("failed to create directory {}", dir.display()))?;
        }
        Vtk {
            version: Version { major: 4, minor: 1 },
            title: self.title.clone().unwrap_or(fallback_title),
            byte_order: ByteOrder::BigEndian,
            data: dataset,
            file_path: None,
        }
        .export(filepath)
        .wrap_err_with(|| format!("failed to export VTK file {}", filepath.display()))
    }
}
