use std::{fs::File, io, path::Path};

use log::debug;
use rustc_hash::FxHashSet;

use crate::{ChEdge, StoreError, VertexId, WeightedGraph};

use super::ContractionHierarchy;

const VERSION_TAG: &str = "ch-flatfile/1";
const MAX_TAG_LEN: u32 = 64;

const FORWARD: u8 = 0b01;
const BACKWARD: u8 = 0b10;

impl ContractionHierarchy {
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        debug!("saving hierarchy to {}", path.display());
        self.write(&mut io::BufWriter::new(File::create(path)?))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        debug!("loading hierarchy from {}", path.display());
        Self::read(&mut io::BufReader::new(File::open(path)?))
    }

    pub fn write(&self, writer: &mut impl io::Write) -> Result<(), StoreError> {
        let graph = &self.graph;

        writer.write_all(&(VERSION_TAG.len() as u32).to_le_bytes())?;
        writer.write_all(VERSION_TAG.as_bytes())?;

        writer.write_all(&graph.vertex_count().to_le_bytes())?;
        for vertex in 0..graph.vertex_count() {
            let coordinate = graph.vertex(vertex);
            writer.write_all(&coordinate.lat.to_le_bytes())?;
            writer.write_all(&coordinate.lon.to_le_bytes())?;
            writer.write_all(&graph.level(vertex).unwrap_or(u32::MAX).to_le_bytes())?;
        }

        for vertex in 0..graph.vertex_count() {
            let edges = graph.edges(vertex);
            writer.write_all(&(edges.len() as u32).to_le_bytes())?;

            for edge in edges {
                let direction = (edge.forward as u8 * FORWARD) | (edge.backward as u8 * BACKWARD);

                writer.write_all(&edge.neighbour.to_le_bytes())?;
                writer.write_all(&edge.weight.to_le_bytes())?;
                writer.write_all(&[direction])?;
                writer.write_all(&edge.contracted_via.map_or(0, |via| via + 1).to_le_bytes())?;
                writer.write_all(&edge.tags.to_le_bytes())?;
            }
        }

        writer.flush()?;
        Ok(())
    }

    pub fn read(reader: &mut impl io::Read) -> Result<Self, StoreError> {
        let mut bytes = [0u8; 4];

        let tag_len = read_u32(&mut bytes, reader)?;
        if tag_len > MAX_TAG_LEN {
            return Err(StoreError::Corrupt(format!(
                "version tag of {tag_len} bytes"
            )));
        }
        let mut tag = vec![0u8; tag_len as usize];
        reader.read_exact(&mut tag)?;
        if tag != VERSION_TAG.as_bytes() {
            return Err(StoreError::UnsupportedVersion {
                found: String::from_utf8_lossy(&tag).into_owned(),
                expected: VERSION_TAG,
            });
        }

        let vertex_count = read_u32(&mut bytes, reader)?;
        let mut graph = WeightedGraph::new();
        // The header is not trusted for allocation sizes.
        let mut levels = vec![];

        for vertex in 0..vertex_count {
            let lat = f32::from_bits(read_u32(&mut bytes, reader)?);
            let lon = f32::from_bits(read_u32(&mut bytes, reader)?);
            let level = read_u32(&mut bytes, reader)?;
            if level == u32::MAX {
                return Err(StoreError::Corrupt(format!(
                    "vertex {vertex} was never contracted"
                )));
            }

            graph.add_vertex(lat, lon);
            levels.push(level);
        }

        let check = |vertex: VertexId, what: &str| {
            if vertex < vertex_count {
                Ok(vertex)
            } else {
                Err(StoreError::Corrupt(format!(
                    "{what} {vertex} out of range, store has {vertex_count} vertices"
                )))
            }
        };

        for vertex in 0..vertex_count {
            let edge_count = read_u32(&mut bytes, reader)?;

            for _ in 0..edge_count {
                let neighbour = check(read_u32(&mut bytes, reader)?, "neighbour")?;
                let weight = f32::from_bits(read_u32(&mut bytes, reader)?);

                let mut direction = [0u8];
                reader.read_exact(&mut direction)?;
                let direction = direction[0];
                if direction == 0 || direction > (FORWARD | BACKWARD) {
                    return Err(StoreError::Corrupt(format!(
                        "edge at vertex {vertex} has direction {direction}"
                    )));
                }

                let contracted_via = match read_u32(&mut bytes, reader)? {
                    0 => None,
                    via => Some(check(via - 1, "contracted vertex")?),
                };
                let tags = read_u32(&mut bytes, reader)?;

                graph.push_raw(
                    vertex,
                    ChEdge {
                        neighbour,
                        weight,
                        forward: direction & FORWARD != 0,
                        backward: direction & BACKWARD != 0,
                        contracted_via,
                        tags,
                    },
                );
            }
        }

        let mut sorted = levels.clone();
        sorted.sort_unstable();
        if let Some(pair) = sorted.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(StoreError::Corrupt(format!(
                "level {} assigned twice",
                pair[0]
            )));
        }

        validate(&graph, &levels)?;

        for (vertex, level) in levels.into_iter().enumerate() {
            graph.mark_contracted(vertex as VertexId, level);
        }

        debug!(
            "read hierarchy with {} vertices and {} edges",
            graph.vertex_count(),
            graph.edge_count()
        );

        Ok(Self::from_graph(graph))
    }
}

/// Rejects records a query could not unfold: a shortcut must bypass a vertex
/// below both of its endpoints, and every travelable direction must be
/// stored at its tail with halves that exist.
fn validate(graph: &WeightedGraph, levels: &[u32]) -> Result<(), StoreError> {
    let level = |vertex: VertexId| levels[vertex as usize];

    let stored: FxHashSet<(VertexId, VertexId)> = (0..graph.vertex_count())
        .flat_map(|vertex| {
            graph
                .edges(vertex)
                .iter()
                .filter(|edge| edge.forward)
                .map(move |edge| (vertex, edge.neighbour))
        })
        .collect();

    for vertex in 0..graph.vertex_count() {
        for edge in graph.edges(vertex) {
            let neighbour = edge.neighbour;
            let arcs = [
                edge.forward.then_some((vertex, neighbour)),
                edge.backward.then_some((neighbour, vertex)),
            ];

            for (from, to) in arcs.into_iter().flatten() {
                if !stored.contains(&(from, to)) {
                    return Err(StoreError::Corrupt(format!(
                        "edge {from} -> {to} is only stored at vertex {to}"
                    )));
                }

                let Some(via) = edge.contracted_via else {
                    continue;
                };
                if level(via) >= level(from) || level(via) >= level(to) {
                    return Err(StoreError::Corrupt(format!(
                        "shortcut {from} -> {to} bypasses vertex {via} which is not below it"
                    )));
                }
                if !stored.contains(&(from, via)) || !stored.contains(&(via, to)) {
                    return Err(StoreError::Corrupt(format!(
                        "shortcut {from} -> {to} via {via} is missing a half"
                    )));
                }
            }
        }
    }

    Ok(())
}

fn read_u32(bytes: &mut [u8; 4], reader: &mut impl io::Read) -> io::Result<u32> {
    reader.read_exact(bytes)?;
    Ok(u32::from_le_bytes(*bytes))
}
