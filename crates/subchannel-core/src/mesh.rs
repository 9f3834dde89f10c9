// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Subchannel Mesh
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Subchannel topology and static geometry.
//!
//! Channels, gaps, pins and duct nodes each live in a dense index space;
//! every adjacency is an index-to-index table. The mesh owns geometry
//! only (areas, perimeters, gap widths, form losses, the axial grid),
//! never solution fields.
//!
//! Two lattice families are supported:
//!
//! - **Triangular**: pins on a hexagonal lattice inside a hexagonal duct.
//!   Center channels are pin triangles, edge channels sit between two
//!   outer-ring pins and the duct flat, corner channels wrap a corner pin.
//! - **Square**: an `nx × ny` array of channels with pins on the interior
//!   channel corners.

use std::f64::consts::PI;

use ndarray::Array2;
use subchannel_types::config::{GeometryConfig, LatticeConfig};
use subchannel_types::error::{SubchannelError, SubchannelResult};

/// Relative tolerance (in pitches) used to recognise lattice neighbours.
const NEIGHBOUR_TOL: f64 = 1e-3;

/// Fraction of a pin perimeter exposed to a triangular center or corner channel.
const TRI_PIN_FRACTION_CENTER: f64 = 1.0 / 6.0;

/// Fraction of a pin perimeter exposed to a triangular edge channel.
const TRI_PIN_FRACTION_EDGE: f64 = 0.25;

/// Fraction of a pin perimeter exposed to each of its four square-lattice channels.
const SQUARE_PIN_FRACTION: f64 = 0.25;

/// Subchannel classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelType {
    Center,
    Edge,
    Corner,
}

/// Lattice family with the parameters the closures need.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lattice {
    Triangular { n_rings: usize, flat_to_flat: f64 },
    Square { nx: usize, ny: usize, side_gap: f64 },
}

impl Lattice {
    pub fn is_square(&self) -> bool {
        matches!(self, Lattice::Square { .. })
    }
}

/// Lateral connector between two channels.
#[derive(Debug, Clone, PartialEq)]
pub struct Gap {
    /// Adjacent channels, lower index first.
    pub channels: (usize, usize),
    /// Pins bordering the gap; duct-side gaps repeat the single pin.
    pub pins: Option<(usize, usize)>,
    /// Gap width (m)
    pub width: f64,
    /// Distance between the two channel centroids (m)
    pub centroid_distance: f64,
}

/// Static subchannel geometry.
#[derive(Debug, Clone)]
pub struct SubchannelMesh {
    lattice: Lattice,
    pitch: f64,
    pin_diameter: f64,
    wire_diameter: f64,
    wire_lead_length: f64,
    heated_length: f64,
    unheated_length_entry: f64,
    unheated_length_exit: f64,
    /// Pin surface to duct distance (triangular) or side gap (square)
    duct_to_pin_gap: f64,
    n_cells: usize,
    z_grid: Vec<f64>,

    channel_types: Vec<ChannelType>,
    channel_positions: Vec<[f64; 2]>,
    channel_pins: Vec<Vec<usize>>,
    channel_gaps: Vec<Vec<usize>>,
    gaps: Vec<Gap>,
    pin_positions: Vec<[f64; 2]>,
    pin_channels: Vec<Vec<usize>>,
    pin_fractions: Vec<Vec<f64>>,
    duct_channels: Vec<usize>,
    duct_positions: Vec<[f64; 2]>,
    channel_duct: Vec<Option<usize>>,

    /// \[level, channel\]
    flow_area: Array2<f64>,
    /// \[level, channel\]
    wetted_perimeter: Array2<f64>,
    /// \[cell, channel\], cell `c` spans levels `c` and `c + 1`
    form_loss: Array2<f64>,
}

/// Topology produced by a lattice builder, before areas are assigned.
struct Topology {
    channel_types: Vec<ChannelType>,
    channel_positions: Vec<[f64; 2]>,
    channel_pins: Vec<Vec<usize>>,
    gaps: Vec<Gap>,
    pin_positions: Vec<[f64; 2]>,
    pin_fraction_of: Box<dyn Fn(ChannelType) -> f64>,
    /// Nominal (unblocked) area and perimeter per channel
    area: Vec<f64>,
    perimeter: Vec<f64>,
    duct_to_pin_gap: f64,
}

fn distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
}

/// Cosine of the wire-wrap helix angle; 1 for a bare bundle.
pub fn wire_cos_theta(pin_diameter: f64, wire_diameter: f64, lead_length: f64) -> f64 {
    if wire_diameter <= 0.0 || lead_length <= 0.0 {
        return 1.0;
    }
    let circ = PI * (pin_diameter + wire_diameter);
    lead_length / (lead_length * lead_length + circ * circ).sqrt()
}

// ───────────────────────────── triangular ───────────────────────────

fn build_triangular(g: &GeometryConfig, n_rings: usize, flat_to_flat: f64) -> SubchannelResult<Topology> {
    let pitch = g.pitch;
    let d = g.pin_diameter;
    let duct_gap = 0.5 * (flat_to_flat - (n_rings as f64 - 1.0) * pitch * 3f64.sqrt() - d);
    if duct_gap <= 0.0 {
        return Err(SubchannelError::GeometryError(format!(
            "flat_to_flat {flat_to_flat} leaves no room between the outer pins and the duct"
        )));
    }

    // Pins ring by ring; ring r has 6r pins, six sides of r steps each
    let mut pin_positions = vec![[0.0, 0.0]];
    let mut ring_start = vec![0usize];
    for r in 1..n_rings {
        ring_start.push(pin_positions.len());
        let rf = r as f64;
        for s in 0..6 {
            let a0 = PI / 3.0 * s as f64;
            let a1 = PI / 3.0 * (s + 1) as f64;
            let c0 = [rf * pitch * a0.cos(), rf * pitch * a0.sin()];
            let c1 = [rf * pitch * a1.cos(), rf * pitch * a1.sin()];
            for t in 0..r {
                let f = t as f64 / rf;
                pin_positions.push([c0[0] + f * (c1[0] - c0[0]), c0[1] + f * (c1[1] - c0[1])]);
            }
        }
    }
    let n_pins = pin_positions.len();

    let mut neighbours: Vec<Vec<usize>> = vec![Vec::new(); n_pins];
    for i in 0..n_pins {
        for j in (i + 1)..n_pins {
            if (distance(pin_positions[i], pin_positions[j]) - pitch).abs() < NEIGHBOUR_TOL * pitch {
                neighbours[i].push(j);
                neighbours[j].push(i);
            }
        }
    }

    let cos_t = wire_cos_theta(d, g.wire_diameter, g.wire_lead_length);
    let wd = if g.has_wire() { g.wire_diameter } else { 0.0 };
    let wire_area = PI * wd * wd / cos_t;
    let wire_perim = PI * wd / cos_t;

    let mut channel_types = Vec::new();
    let mut channel_positions = Vec::new();
    let mut channel_pins: Vec<Vec<usize>> = Vec::new();
    let mut area = Vec::new();
    let mut perimeter = Vec::new();

    // Center channels: mutually adjacent pin triples
    for i in 0..n_pins {
        for &j in neighbours[i].iter().filter(|&&j| j > i) {
            for &k in neighbours[j].iter().filter(|&&k| k > j) {
                if neighbours[i].contains(&k) {
                    let (pi, pj, pk) = (pin_positions[i], pin_positions[j], pin_positions[k]);
                    channel_types.push(ChannelType::Center);
                    channel_positions.push([
                        (pi[0] + pj[0] + pk[0]) / 3.0,
                        (pi[1] + pj[1] + pk[1]) / 3.0,
                    ]);
                    channel_pins.push(vec![i, j, k]);
                    area.push(3f64.sqrt() / 4.0 * pitch * pitch - PI * d * d / 8.0 - wire_area / 8.0);
                    perimeter.push(PI * d / 2.0 + wire_perim / 2.0);
                }
            }
        }
    }

    // Peripheral channels in outer-ring order
    let first_peripheral = channel_types.len();
    let outer = n_rings - 1;
    let start = ring_start[outer];
    let n_outer = 6 * outer;
    let offset = d / 2.0 + duct_gap / 2.0;
    for m in 0..n_outer {
        let pin = start + m;
        let next = start + (m + 1) % n_outer;
        let side = m / outer;
        if m % outer == 0 {
            let p = pin_positions[pin];
            let norm = (p[0] * p[0] + p[1] * p[1]).sqrt();
            channel_types.push(ChannelType::Corner);
            channel_positions.push([p[0] + offset * p[0] / norm, p[1] + offset * p[1] / norm]);
            channel_pins.push(vec![pin]);
            let w = d / 2.0 + duct_gap;
            area.push(w * w / 3f64.sqrt() - PI * d * d / 24.0 - wire_area / 24.0);
            perimeter.push(PI * d / 6.0 + wire_perim / 6.0 + 2.0 * w / 3f64.sqrt());
        }
        let (a, b) = (pin_positions[pin], pin_positions[next]);
        let normal = PI / 3.0 * side as f64 + PI / 6.0;
        channel_types.push(ChannelType::Edge);
        channel_positions.push([
            0.5 * (a[0] + b[0]) + offset * normal.cos(),
            0.5 * (a[1] + b[1]) + offset * normal.sin(),
        ]);
        channel_pins.push(vec![pin, next]);
        area.push(pitch * (d / 2.0 + duct_gap) - PI * d * d / 8.0 - wire_area / 8.0);
        perimeter.push(PI * d / 2.0 + wire_perim / 2.0 + pitch);
    }
    let n_channels = channel_types.len();
    if n_channels != g.n_channels() {
        return Err(SubchannelError::GeometryError(format!(
            "triangular lattice produced {n_channels} channels, expected {}",
            g.n_channels()
        )));
    }

    // Pin-pair gaps: the two channels that hold both pins
    let mut gaps = Vec::new();
    for i in 0..n_pins {
        for &j in neighbours[i].iter().filter(|&&j| j > i) {
            let owners: Vec<usize> = (0..n_channels)
                .filter(|&c| channel_pins[c].contains(&i) && channel_pins[c].contains(&j))
                .collect();
            if owners.len() != 2 {
                return Err(SubchannelError::GeometryError(format!(
                    "pin pair ({i}, {j}) borders {} channels",
                    owners.len()
                )));
            }
            gaps.push(Gap {
                channels: (owners[0].min(owners[1]), owners[0].max(owners[1])),
                pins: Some((i, j)),
                width: pitch - d,
                centroid_distance: distance(channel_positions[owners[0]], channel_positions[owners[1]]),
            });
        }
    }
    // Duct-side gaps between consecutive peripheral channels
    for c in first_peripheral..n_channels {
        let next = if c + 1 < n_channels { c + 1 } else { first_peripheral };
        let shared = channel_pins[c]
            .iter()
            .copied()
            .find(|p| channel_pins[next].contains(p))
            .ok_or_else(|| {
                SubchannelError::GeometryError(format!(
                    "peripheral channels {c} and {next} share no pin"
                ))
            })?;
        gaps.push(Gap {
            channels: (c.min(next), c.max(next)),
            pins: Some((shared, shared)),
            width: duct_gap,
            centroid_distance: distance(channel_positions[c], channel_positions[next]),
        });
    }

    Ok(Topology {
        channel_types,
        channel_positions,
        channel_pins,
        gaps,
        pin_positions,
        pin_fraction_of: Box::new(|t| match t {
            ChannelType::Edge => TRI_PIN_FRACTION_EDGE,
            _ => TRI_PIN_FRACTION_CENTER,
        }),
        area,
        perimeter,
        duct_to_pin_gap: duct_gap,
    })
}

// ───────────────────────────── square ───────────────────────────────

fn build_square(g: &GeometryConfig, nx: usize, ny: usize, side_gap: f64) -> SubchannelResult<Topology> {
    let pitch = g.pitch;
    let d = g.pin_diameter;

    // Lateral extent of channel column/row `i` out of `n`
    let extent = |i: usize, n: usize| -> f64 {
        if n == 1 {
            pitch + 2.0 * side_gap
        } else if i == 0 || i == n - 1 {
            pitch / 2.0 + side_gap
        } else {
            pitch
        }
    };
    // Coordinate of the channel center; pin column p sits at x = p·pitch
    let center = |i: usize, n: usize| -> f64 {
        if n == 1 {
            -0.5 * pitch
        } else if i == 0 {
            -0.5 * extent(0, n)
        } else if i == n - 1 {
            (n as f64 - 2.0) * pitch + 0.5 * extent(i, n)
        } else {
            (i as f64 - 0.5) * pitch
        }
    };

    let npx = nx.saturating_sub(1);
    let npy = ny.saturating_sub(1);
    let pin_index = |px: usize, py: usize| py * npx + px;
    let mut pin_positions = Vec::with_capacity(npx * npy);
    for py in 0..npy {
        for px in 0..npx {
            pin_positions.push([px as f64 * pitch, py as f64 * pitch]);
        }
    }

    let n_channels = nx * ny;
    let mut channel_types = Vec::with_capacity(n_channels);
    let mut channel_positions = Vec::with_capacity(n_channels);
    let mut channel_pins = Vec::with_capacity(n_channels);
    let mut area = Vec::with_capacity(n_channels);
    let mut perimeter = Vec::with_capacity(n_channels);
    for iy in 0..ny {
        for ix in 0..nx {
            let bx = ix == 0 || ix == nx - 1;
            let by = iy == 0 || iy == ny - 1;
            channel_types.push(match (bx, by) {
                (true, true) => ChannelType::Corner,
                (false, false) => ChannelType::Center,
                _ => ChannelType::Edge,
            });
            channel_positions.push([center(ix, nx), center(iy, ny)]);

            // Pins on the four corners of channel (ix, iy)
            let mut pins = Vec::new();
            let (left, below) = (ix.wrapping_sub(1), iy.wrapping_sub(1));
            for (px, py) in [(left, below), (ix, below), (left, iy), (ix, iy)] {
                if px < npx && py < npy {
                    pins.push(pin_index(px, py));
                }
            }
            let (ex, ey) = (extent(ix, nx), extent(iy, ny));
            let mut walls = 0.0;
            if ix == 0 {
                walls += ey;
            }
            if ix == nx - 1 {
                walls += ey;
            }
            if iy == 0 {
                walls += ex;
            }
            if iy == ny - 1 {
                walls += ex;
            }
            area.push(ex * ey - pins.len() as f64 * PI * d * d / 16.0);
            perimeter.push(pins.len() as f64 * PI * d / 4.0 + walls);
            channel_pins.push(pins);
        }
    }

    let mut gaps = Vec::new();
    let gap_pins = |a: Option<usize>, b: Option<usize>| match (a, b) {
        (Some(a), Some(b)) => Some((a.min(b), a.max(b))),
        (Some(a), None) | (None, Some(a)) => Some((a, a)),
        (None, None) => None,
    };
    for iy in 0..ny {
        for ix in 0..nx {
            let c = iy * nx + ix;
            if ix + 1 < nx {
                // Vertical gap line on pin column ix
                let below = (iy >= 1).then(|| pin_index(ix, iy - 1));
                let above = (iy < npy).then(|| pin_index(ix, iy));
                let pins = gap_pins(below, above);
                let n_gap_pins = below.is_some() as usize + above.is_some() as usize;
                let width = extent(iy, ny) - n_gap_pins as f64 * d / 2.0;
                gaps.push(Gap {
                    channels: (c, c + 1),
                    pins,
                    width,
                    centroid_distance: pitch,
                });
            }
            if iy + 1 < ny {
                let left = (ix >= 1).then(|| pin_index(ix - 1, iy));
                let right = (ix < npx).then(|| pin_index(ix, iy));
                let pins = gap_pins(left, right);
                let n_gap_pins = left.is_some() as usize + right.is_some() as usize;
                let width = extent(ix, nx) - n_gap_pins as f64 * d / 2.0;
                gaps.push(Gap {
                    channels: (c, c + nx),
                    pins,
                    width,
                    centroid_distance: pitch,
                });
            }
        }
    }

    Ok(Topology {
        channel_types,
        channel_positions,
        channel_pins,
        gaps,
        pin_positions,
        pin_fraction_of: Box::new(|_| SQUARE_PIN_FRACTION),
        area,
        perimeter,
        duct_to_pin_gap: side_gap,
    })
}

// ───────────────────────────── mesh ─────────────────────────────────

impl SubchannelMesh {
    /// Build the mesh described by `geometry`. Blockage and form losses
    /// are applied here so the solver sees final areas.
    pub fn new(geometry: &GeometryConfig) -> SubchannelResult<Self> {
        let (lattice, topo) = match geometry.lattice {
            LatticeConfig::Triangular { n_rings, flat_to_flat } => (
                Lattice::Triangular { n_rings, flat_to_flat },
                build_triangular(geometry, n_rings, flat_to_flat)?,
            ),
            LatticeConfig::Square { nx, ny, side_gap } => (
                Lattice::Square { nx, ny, side_gap },
                build_square(geometry, nx, ny, side_gap)?,
            ),
        };
        if let Some(c) = topo.area.iter().position(|&a| a <= 0.0) {
            return Err(SubchannelError::GeometryError(format!(
                "channel {c} has non-positive flow area {}",
                topo.area[c]
            )));
        }

        let n_cells = geometry.n_cells;
        let length = geometry.total_length();
        let z_grid: Vec<f64> = (0..=n_cells)
            .map(|iz| length * iz as f64 / n_cells as f64)
            .collect();

        let n_channels = topo.channel_types.len();
        let n_pins = topo.pin_positions.len();
        let mut channel_gaps = vec![Vec::new(); n_channels];
        for (ig, gap) in topo.gaps.iter().enumerate() {
            channel_gaps[gap.channels.0].push(ig);
            channel_gaps[gap.channels.1].push(ig);
        }
        let mut pin_channels = vec![Vec::new(); n_pins];
        let mut pin_fractions = vec![Vec::new(); n_pins];
        for (c, pins) in topo.channel_pins.iter().enumerate() {
            for &p in pins {
                pin_channels[p].push(c);
                pin_fractions[p].push((topo.pin_fraction_of)(topo.channel_types[c]));
            }
        }

        // Duct nodes sit on the wall outside every peripheral channel and
        // are attached to the nearest channel.
        let peripheral: Vec<usize> = (0..n_channels)
            .filter(|&c| topo.channel_types[c] != ChannelType::Center)
            .collect();
        let inv_n = 1.0 / n_channels as f64;
        let middle = topo.channel_positions.iter().fold([0.0, 0.0], |acc, p| {
            [acc[0] + p[0] * inv_n, acc[1] + p[1] * inv_n]
        });
        let push = 0.5 * topo.duct_to_pin_gap;
        let mut duct_positions = Vec::with_capacity(peripheral.len());
        for &c in &peripheral {
            let p = topo.channel_positions[c];
            let (dx, dy) = (p[0] - middle[0], p[1] - middle[1]);
            let norm = (dx * dx + dy * dy).sqrt().max(1e-12);
            duct_positions.push([p[0] + push * dx / norm, p[1] + push * dy / norm]);
        }
        let mut duct_channels = Vec::with_capacity(peripheral.len());
        let mut channel_duct = vec![None; n_channels];
        for (dn, &pos) in duct_positions.iter().enumerate() {
            let mut best = peripheral[dn];
            let mut best_dist = f64::INFINITY;
            for &c in &peripheral {
                let dist = distance(pos, topo.channel_positions[c]);
                if dist < best_dist {
                    best_dist = dist;
                    best = c;
                }
            }
            duct_channels.push(best);
            channel_duct[best] = Some(dn);
        }

        let mut flow_area = Array2::zeros((n_cells + 1, n_channels));
        let mut wetted_perimeter = Array2::zeros((n_cells + 1, n_channels));
        for iz in 0..=n_cells {
            for c in 0..n_channels {
                flow_area[[iz, c]] = topo.area[c];
                wetted_perimeter[[iz, c]] = topo.perimeter[c];
            }
        }
        let mut form_loss = Array2::zeros((n_cells, n_channels));
        if let Some(k) = &geometry.k_grid {
            for (c, row) in k.iter().enumerate() {
                for (cell, &v) in row.iter().enumerate() {
                    form_loss[[cell, c]] = v;
                }
            }
        }
        if let Some(b) = &geometry.blockage {
            for (iz, &z) in z_grid.iter().enumerate() {
                if z < b.z_blockage[0] || z > b.z_blockage[1] {
                    continue;
                }
                for (&c, &r) in b.index_blockage.iter().zip(b.reduction_blockage.iter()) {
                    flow_area[[iz, c]] *= r;
                    if iz > 0 {
                        form_loss[[iz - 1, c]] += b.k_blockage;
                    }
                }
            }
        }

        Ok(SubchannelMesh {
            lattice,
            pitch: geometry.pitch,
            pin_diameter: geometry.pin_diameter,
            wire_diameter: geometry.wire_diameter,
            wire_lead_length: geometry.wire_lead_length,
            heated_length: geometry.heated_length,
            unheated_length_entry: geometry.unheated_length_entry,
            unheated_length_exit: geometry.unheated_length_exit,
            duct_to_pin_gap: topo.duct_to_pin_gap,
            n_cells,
            z_grid,
            channel_types: topo.channel_types,
            channel_positions: topo.channel_positions,
            channel_pins: topo.channel_pins,
            channel_gaps,
            gaps: topo.gaps,
            pin_positions: topo.pin_positions,
            pin_channels,
            pin_fractions,
            duct_channels,
            duct_positions,
            channel_duct,
            flow_area,
            wetted_perimeter,
            form_loss,
        })
    }

    // ── counts and geometry ──

    pub fn lattice(&self) -> Lattice {
        self.lattice
    }
    pub fn n_channels(&self) -> usize {
        self.channel_types.len()
    }
    pub fn n_gaps(&self) -> usize {
        self.gaps.len()
    }
    pub fn n_pins(&self) -> usize {
        self.pin_positions.len()
    }
    pub fn n_duct_nodes(&self) -> usize {
        self.duct_channels.len()
    }
    pub fn n_cells(&self) -> usize {
        self.n_cells
    }
    pub fn pitch(&self) -> f64 {
        self.pitch
    }
    pub fn pin_diameter(&self) -> f64 {
        self.pin_diameter
    }
    pub fn wire_diameter(&self) -> f64 {
        self.wire_diameter
    }
    pub fn wire_lead_length(&self) -> f64 {
        self.wire_lead_length
    }
    pub fn has_wire(&self) -> bool {
        self.wire_diameter > 0.0 && self.wire_lead_length > 0.0
    }
    /// Duct flat-to-flat distance, triangular lattices only.
    pub fn flat_to_flat(&self) -> Option<f64> {
        match self.lattice {
            Lattice::Triangular { flat_to_flat, .. } => Some(flat_to_flat),
            Lattice::Square { .. } => None,
        }
    }
    pub fn duct_to_pin_gap(&self) -> f64 {
        self.duct_to_pin_gap
    }
    pub fn heated_length(&self) -> f64 {
        self.heated_length
    }
    pub fn unheated_length_entry(&self) -> f64 {
        self.unheated_length_entry
    }
    pub fn unheated_length_exit(&self) -> f64 {
        self.unheated_length_exit
    }
    pub fn z_grid(&self) -> &[f64] {
        &self.z_grid
    }
    /// Height of cell `iz`, i.e. between levels `iz - 1` and `iz`.
    pub fn dz(&self, iz: usize) -> f64 {
        self.z_grid[iz] - self.z_grid[iz - 1]
    }

    /// True when cell `iz` overlaps the heated section.
    pub fn is_heated_cell(&self, iz: usize) -> bool {
        let tol = 1e-12 * self.z_grid[self.n_cells].max(1.0);
        let entry = self.unheated_length_entry;
        self.z_grid[iz] > entry + tol && self.z_grid[iz - 1] < entry + self.heated_length - tol
    }

    /// True when level `iz` lies in `[entry, entry + heated_length]`.
    pub fn is_heated_level(&self, iz: usize) -> bool {
        let tol = 1e-12 * self.z_grid[self.n_cells].max(1.0);
        let z = self.z_grid[iz];
        let entry = self.unheated_length_entry;
        z >= entry - tol && z <= entry + self.heated_length + tol
    }

    // ── channels ──

    pub fn channel_type(&self, i_ch: usize) -> ChannelType {
        self.channel_types[i_ch]
    }
    pub fn channel_position(&self, i_ch: usize) -> [f64; 2] {
        self.channel_positions[i_ch]
    }
    pub fn channel_pins(&self, i_ch: usize) -> &[usize] {
        &self.channel_pins[i_ch]
    }
    pub fn channel_gaps(&self, i_ch: usize) -> &[usize] {
        &self.channel_gaps[i_ch]
    }
    pub fn flow_area(&self, iz: usize, i_ch: usize) -> f64 {
        self.flow_area[[iz, i_ch]]
    }
    pub fn wetted_perimeter(&self, iz: usize, i_ch: usize) -> f64 {
        self.wetted_perimeter[[iz, i_ch]]
    }
    pub fn hydraulic_diameter(&self, iz: usize, i_ch: usize) -> f64 {
        4.0 * self.flow_area(iz, i_ch) / self.wetted_perimeter(iz, i_ch)
    }
    /// Form loss of cell `iz` (between levels `iz - 1` and `iz`).
    pub fn form_loss(&self, iz: usize, i_ch: usize) -> f64 {
        self.form_loss[[iz - 1, i_ch]]
    }

    // ── gaps ──

    pub fn gap(&self, i_gap: usize) -> &Gap {
        &self.gaps[i_gap]
    }
    pub fn gap_channels(&self, i_gap: usize) -> (usize, usize) {
        self.gaps[i_gap].channels
    }
    pub fn gap_pins(&self, i_gap: usize) -> Option<(usize, usize)> {
        self.gaps[i_gap].pins
    }
    /// Gap width at level `iz`; constant along the bundle.
    pub fn gap_width(&self, _iz: usize, i_gap: usize) -> f64 {
        self.gaps[i_gap].width
    }
    /// +1 when `i_ch` is the first channel of the gap, −1 otherwise.
    pub fn crossflow_sign(&self, i_ch: usize, i_gap: usize) -> f64 {
        if self.gaps[i_gap].channels.0 == i_ch {
            1.0
        } else {
            -1.0
        }
    }

    // ── pins and duct ──

    pub fn pin_position(&self, i_pin: usize) -> [f64; 2] {
        self.pin_positions[i_pin]
    }
    pub fn pin_channels(&self, i_pin: usize) -> &[usize] {
        &self.pin_channels[i_pin]
    }
    /// Perimeter fraction of pin `i_pin` facing each of [`Self::pin_channels`].
    pub fn pin_channel_fractions(&self, i_pin: usize) -> &[f64] {
        &self.pin_fractions[i_pin]
    }
    /// Perimeter fraction of pin `i_pin` facing channel `i_ch`.
    pub fn pin_fraction(&self, i_pin: usize, i_ch: usize) -> f64 {
        self.pin_channels[i_pin]
            .iter()
            .zip(self.pin_fractions[i_pin].iter())
            .find(|(&c, _)| c == i_ch)
            .map_or(0.0, |(_, &f)| f)
    }
    pub fn duct_channel(&self, duct_node: usize) -> usize {
        self.duct_channels[duct_node]
    }
    pub fn duct_position(&self, duct_node: usize) -> [f64; 2] {
        self.duct_positions[duct_node]
    }
    pub fn channel_duct_node(&self, i_ch: usize) -> Option<usize> {
        self.channel_duct[i_ch]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use subchannel_types::config::BlockageConfig;

    fn hex(n_rings: usize) -> GeometryConfig {
        GeometryConfig {
            lattice: LatticeConfig::Triangular {
                n_rings,
                flat_to_flat: 0.0373 + (n_rings as f64 - 3.0) * 8.0e-3 * 3f64.sqrt(),
            },
            pitch: 8.0e-3,
            pin_diameter: 6.5e-3,
            wire_diameter: 1.4e-3,
            wire_lead_length: 0.2,
            heated_length: 1.0,
            unheated_length_entry: 0.0,
            unheated_length_exit: 0.0,
            n_cells: 10,
            n_blocks: 1,
            blockage: None,
            k_grid: None,
        }
    }

    fn square(nx: usize, ny: usize) -> GeometryConfig {
        GeometryConfig {
            lattice: LatticeConfig::Square {
                nx,
                ny,
                side_gap: 1.0e-3,
            },
            pitch: 0.0126,
            pin_diameter: 0.0095,
            wire_diameter: 0.0,
            wire_lead_length: 0.0,
            ..hex(3)
        }
    }

    #[test]
    fn test_hex_counts() {
        let mesh = SubchannelMesh::new(&hex(3)).unwrap();
        assert_eq!(mesh.n_pins(), 19);
        assert_eq!(mesh.n_channels(), 42);
        assert_eq!(mesh.n_gaps(), 42 + 19 - 1);
        assert_eq!(mesh.n_duct_nodes(), 18);
        let corners = (0..42)
            .filter(|&c| mesh.channel_type(c) == ChannelType::Corner)
            .count();
        let edges = (0..42)
            .filter(|&c| mesh.channel_type(c) == ChannelType::Edge)
            .count();
        assert_eq!(corners, 6);
        assert_eq!(edges, 12);
    }

    #[test]
    fn test_pin_fractions_sum_to_one() {
        for g in [hex(2), hex(3), hex(4)] {
            let mesh = SubchannelMesh::new(&g).unwrap();
            for p in 0..mesh.n_pins() {
                let s: f64 = mesh.pin_channel_fractions(p).iter().sum();
                assert!((s - 1.0).abs() < 1e-12, "pin {p}: {s}");
            }
        }
        let mesh = SubchannelMesh::new(&square(4, 3)).unwrap();
        for p in 0..mesh.n_pins() {
            let s: f64 = mesh.pin_channel_fractions(p).iter().sum();
            assert!((s - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_gap_channels_ordered_and_signed() {
        let mesh = SubchannelMesh::new(&hex(3)).unwrap();
        for ig in 0..mesh.n_gaps() {
            let (i, j) = mesh.gap_channels(ig);
            assert!(i < j);
            assert_eq!(mesh.crossflow_sign(i, ig), 1.0);
            assert_eq!(mesh.crossflow_sign(j, ig), -1.0);
            assert!(mesh.gap_pins(ig).is_some());
            assert!(mesh.gap_width(0, ig) > 0.0);
        }
        // Each center channel has three gaps
        for c in 0..mesh.n_channels() {
            if mesh.channel_type(c) == ChannelType::Center {
                assert_eq!(mesh.channel_gaps(c).len(), 3);
            }
        }
    }

    #[test]
    fn test_square_areas() {
        let mesh = SubchannelMesh::new(&square(3, 3)).unwrap();
        assert_eq!(mesh.n_pins(), 4);
        assert_eq!(mesh.n_gaps(), 12);
        let p = 0.0126;
        let d = 0.0095;
        let center = 4;
        assert_eq!(mesh.channel_type(center), ChannelType::Center);
        let expected = p * p - PI * d * d / 4.0;
        assert!((mesh.flow_area(0, center) - expected).abs() < 1e-14);
        assert!((mesh.wetted_perimeter(0, center) - PI * d).abs() < 1e-14);
        assert_eq!(mesh.channel_type(0), ChannelType::Corner);
        assert_eq!(mesh.channel_type(1), ChannelType::Edge);
    }

    #[test]
    fn test_single_square_channel() {
        let mesh = SubchannelMesh::new(&square(1, 1)).unwrap();
        assert_eq!(mesh.n_channels(), 1);
        assert_eq!(mesh.n_pins(), 0);
        assert_eq!(mesh.n_gaps(), 0);
        let side = 0.0126 + 2.0e-3;
        assert!((mesh.flow_area(3, 0) - side * side).abs() < 1e-14);
        assert!((mesh.wetted_perimeter(3, 0) - 4.0 * side).abs() < 1e-14);
    }

    #[test]
    fn test_duct_nodes_map_to_peripheral_channels() {
        let mesh = SubchannelMesh::new(&hex(3)).unwrap();
        for dn in 0..mesh.n_duct_nodes() {
            let c = mesh.duct_channel(dn);
            assert_ne!(mesh.channel_type(c), ChannelType::Center);
            assert_eq!(mesh.channel_duct_node(c), Some(dn));
        }
    }

    #[test]
    fn test_blockage_reduces_area() {
        let mut g = hex(3);
        g.blockage = Some(BlockageConfig {
            index_blockage: vec![0],
            reduction_blockage: vec![0.5],
            z_blockage: [0.45, 0.55],
            k_blockage: 2.0,
        });
        let mesh = SubchannelMesh::new(&g).unwrap();
        let open = mesh.flow_area(0, 0);
        assert!((mesh.flow_area(5, 0) - 0.5 * open).abs() < 1e-15);
        assert!((mesh.flow_area(4, 0) - open).abs() < 1e-15);
        assert!((mesh.form_loss(5, 0) - 2.0).abs() < 1e-15);
        assert_eq!(mesh.form_loss(4, 0), 0.0);
    }

    #[test]
    fn test_duct_too_small() {
        let mut g = hex(3);
        g.lattice = LatticeConfig::Triangular {
            n_rings: 3,
            flat_to_flat: 0.02,
        };
        assert!(matches!(
            SubchannelMesh::new(&g),
            Err(SubchannelError::GeometryError(_))
        ));
    }

    #[test]
    fn test_heated_cells() {
        let mut g = hex(3);
        g.unheated_length_entry = 0.2;
        g.heated_length = 0.6;
        g.unheated_length_exit = 0.2;
        let mesh = SubchannelMesh::new(&g).unwrap();
        let heated: Vec<usize> = (1..=10).filter(|&iz| mesh.is_heated_cell(iz)).collect();
        assert_eq!(heated, vec![3, 4, 5, 6, 7, 8]);
    }
}
