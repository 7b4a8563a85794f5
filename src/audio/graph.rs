//! Offline processing graph.
//!
//! A [`RenderGraph`] is a small DAG of [`Node`]s rendered to completion in one pass: every node
//! receives the sum of its inputs, processes it, and hands the result to its consumers. The sink's
//! output is the rendered buffer.

use crate::audio::biquad::{BiquadCoeffs, BiquadState};
use crate::audio::buffer::{PcmBuffer, SharedPcm, remix_channels};
use crate::audio::param::AudioParam;
use crate::foundation::error::{MixdownError, MixdownResult};
use std::collections::VecDeque;

/// Handle to a node inside one [`RenderGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Processing node kinds.
#[derive(Clone, Debug)]
pub enum Node {
    /// Plays `buffer` starting at `start_frame`; never has inputs.
    Source {
        /// Material to play. Must already be at the graph sample rate.
        buffer: SharedPcm,
        /// Output frame at which playback starts.
        start_frame: usize,
    },
    /// Multiplies its input by an automatable gain.
    Gain {
        /// Linear gain.
        gain: AudioParam,
    },
    /// RBJ peaking filter with automatable gain.
    Peaking {
        /// Center frequency in Hz.
        frequency: f64,
        /// Quality factor.
        q: f64,
        /// Boost/cut in dB.
        gain_db: AudioParam,
    },
    /// Graph output; exactly one per graph.
    Sink,
}

/// Directed acyclic graph of processing nodes at a fixed rate and channel count.
#[derive(Clone, Debug)]
pub struct RenderGraph {
    sample_rate: u32,
    channels: usize,
    nodes: Vec<Node>,
    edges: Vec<(usize, usize)>,
}

type Planar = Vec<Vec<f32>>;

impl RenderGraph {
    /// Empty graph rendering `channels` channels at `sample_rate`.
    pub fn new(sample_rate: u32, channels: usize) -> Self {
        Self {
            sample_rate,
            channels: channels.max(1),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Add a node and return its handle.
    pub fn add(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Connect `from`'s output to `to`'s input.
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> MixdownResult<()> {
        let (Some(src), Some(dst)) = (self.nodes.get(from.0), self.nodes.get(to.0)) else {
            return Err(MixdownError::processing("connect: unknown node id"));
        };
        if from == to {
            return Err(MixdownError::processing("connect: node cannot feed itself"));
        }
        if matches!(src, Node::Sink) {
            return Err(MixdownError::processing("connect: sink has no output"));
        }
        if matches!(dst, Node::Source { .. }) {
            return Err(MixdownError::processing("connect: source accepts no input"));
        }
        self.edges.push((from.0, to.0));
        Ok(())
    }

    /// Connect `ids` in order, forming a chain.
    pub fn chain(&mut self, ids: &[NodeId]) -> MixdownResult<()> {
        for pair in ids.windows(2) {
            self.connect(pair[0], pair[1])?;
        }
        Ok(())
    }

    /// Number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Render `frames` frames to completion and return the sink output.
    pub fn render(&self, frames: usize) -> MixdownResult<PcmBuffer> {
        let sinks = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| matches!(n, Node::Sink))
            .map(|(i, _)| i)
            .collect::<Vec<_>>();
        let &[sink] = sinks.as_slice() else {
            return Err(MixdownError::processing(format!(
                "render graph needs exactly one sink, found {}",
                sinks.len()
            )));
        };

        let order = self.topological_order()?;
        let mut inputs = vec![Vec::<usize>::new(); self.nodes.len()];
        let mut pending_reads = vec![0usize; self.nodes.len()];
        for &(from, to) in &self.edges {
            inputs[to].push(from);
            pending_reads[from] += 1;
        }

        let mut outputs: Vec<Option<Planar>> = vec![None; self.nodes.len()];
        for idx in order {
            let mut buf = self.gather(&inputs[idx], &mut outputs, &mut pending_reads, frames);
            self.process(&self.nodes[idx], &mut buf, frames)?;
            outputs[idx] = Some(buf);
        }

        let out = outputs[sink]
            .take()
            .unwrap_or_else(|| vec![vec![0.0; frames]; self.channels]);
        PcmBuffer::new(self.sample_rate, out)
    }

    fn topological_order(&self) -> MixdownResult<Vec<usize>> {
        let n = self.nodes.len();
        let mut indegree = vec![0usize; n];
        let mut succ = vec![Vec::<usize>::new(); n];
        for &(from, to) in &self.edges {
            indegree[to] += 1;
            succ[from].push(to);
        }
        let mut queue = (0..n).filter(|&i| indegree[i] == 0).collect::<VecDeque<_>>();
        let mut order = Vec::with_capacity(n);
        while let Some(i) = queue.pop_front() {
            order.push(i);
            for &j in &succ[i] {
                indegree[j] -= 1;
                if indegree[j] == 0 {
                    queue.push_back(j);
                }
            }
        }
        if order.len() != n {
            return Err(MixdownError::processing("render graph contains a cycle"));
        }
        Ok(order)
    }

    fn gather(
        &self,
        inputs: &[usize],
        outputs: &mut [Option<Planar>],
        pending_reads: &mut [usize],
        frames: usize,
    ) -> Planar {
        let mut acc: Option<Planar> = None;
        for &src in inputs {
            pending_reads[src] -= 1;
            let last_reader = pending_reads[src] == 0;
            let Some(data) = (if last_reader {
                outputs[src].take()
            } else {
                outputs[src].clone()
            }) else {
                continue;
            };
            match acc.as_mut() {
                None => acc = Some(data),
                Some(sum) => {
                    for (s, d) in sum.iter_mut().zip(&data) {
                        for (a, b) in s.iter_mut().zip(d) {
                            *a += b;
                        }
                    }
                }
            }
        }
        acc.unwrap_or_else(|| vec![vec![0.0; frames]; self.channels])
    }

    fn process(&self, node: &Node, buf: &mut Planar, frames: usize) -> MixdownResult<()> {
        match node {
            Node::Source {
                buffer,
                start_frame,
            } => {
                if buffer.sample_rate() != self.sample_rate {
                    return Err(MixdownError::processing(format!(
                        "source at {} Hz in a {} Hz graph",
                        buffer.sample_rate(),
                        self.sample_rate
                    )));
                }
                write_source(buf, buffer, *start_frame, self.channels, frames);
            }
            Node::Gain { gain } => self.apply_gain(buf, gain),
            Node::Peaking {
                frequency,
                q,
                gain_db,
            } => self.apply_peaking(buf, *frequency, *q, gain_db),
            Node::Sink => {}
        }
        Ok(())
    }

    fn apply_gain(&self, buf: &mut Planar, gain: &AudioParam) {
        if gain.is_static() {
            let g = gain.default_value() as f32;
            if g == 1.0 {
                return;
            }
            for ch in buf.iter_mut() {
                ch.iter_mut().for_each(|s| *s *= g);
            }
            return;
        }
        let mut values = vec![0.0f32; buf.first().map_or(0, Vec::len)];
        gain.fill(&mut values, 0, self.sample_rate);
        for ch in buf.iter_mut() {
            for (s, g) in ch.iter_mut().zip(&values) {
                *s *= g;
            }
        }
    }

    fn apply_peaking(&self, buf: &mut Planar, frequency: f64, q: f64, gain_db: &AudioParam) {
        if gain_db.is_static() {
            let coeffs =
                BiquadCoeffs::peaking(frequency, q, gain_db.default_value(), self.sample_rate);
            if coeffs == BiquadCoeffs::IDENTITY {
                return;
            }
            for ch in buf.iter_mut() {
                let mut state = BiquadState::default();
                ch.iter_mut().for_each(|s| *s = state.process(*s, &coeffs));
            }
            return;
        }

        let mut gains = vec![0.0f32; buf.first().map_or(0, Vec::len)];
        gain_db.fill(&mut gains, 0, self.sample_rate);
        let mut states = vec![BiquadState::default(); buf.len()];
        let mut current = f32::NAN;
        let mut coeffs = BiquadCoeffs::IDENTITY;
        for (i, &g) in gains.iter().enumerate() {
            if g != current {
                current = g;
                coeffs = BiquadCoeffs::peaking(frequency, q, f64::from(g), self.sample_rate);
            }
            for (ch, st) in buf.iter_mut().zip(states.iter_mut()) {
                ch[i] = st.process(ch[i], &coeffs);
            }
        }
    }
}

fn write_source(
    buf: &mut Planar,
    source: &PcmBuffer,
    start_frame: usize,
    channels: usize,
    frames: usize,
) {
    if start_frame >= frames || source.is_empty() {
        return;
    }
    let remixed;
    let src = if source.channel_count() == channels {
        source
    } else {
        remixed = remix_channels(source, channels);
        &remixed
    };
    let n = source.len().min(frames - start_frame);
    for (dst, ch) in buf.iter_mut().zip(src.channels()) {
        for (d, s) in dst[start_frame..start_frame + n].iter_mut().zip(&ch[..n]) {
            *d += s;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/graph.rs"]
mod tests;
