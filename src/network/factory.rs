//! Builds networks by type and moves them to and from the binary file
//! format.
//!
//! # File layout
//! ```text
//! u32        network type tag (see NetType)
//! u32        layer count L
//! u32 × L    layer sizes, input layer first, as reported by layer_size()
//! f64 × N    parameter block, N = data_size(), in the order save() emits
//! ```
//! All values use the host's native byte order, so files only move between
//! hosts of the same endianness.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{ByteOrder, NativeEndian, ReadBytesExt, WriteBytesExt};
use tracing::debug;

use crate::data::ExampleSet;
use crate::error::{NetError, Result};
use crate::network::h_input::HInputNet;
use crate::network::net_type::NetType;
use crate::network::network::Net;
use crate::network::output_blending::OutputBlendingNet;
use crate::network::plain::PlainNet;
use crate::network::uesmann::UesNet;

/// Upper bound on the layer count accepted from a file header.
const MAX_LAYERS: usize = 256;

/// Upper bound on each layer size accepted from a file header.
const MAX_LAYER_SIZE: usize = 4096;

/// Builds a network of type `t` with the given layer sizes.
pub fn make_net(t: NetType, sizes: &[usize]) -> Result<Box<dyn Net>> {
    Ok(match t {
        NetType::Plain => Box::new(PlainNet::new(sizes)?),
        NetType::OutputBlending => Box::new(OutputBlendingNet::new(sizes)?),
        NetType::HInput => Box::new(HInputNet::new(sizes)?),
        NetType::Uesmann => Box::new(UesNet::new(sizes)?),
    })
}

/// Builds a network from a raw type tag, failing on tags no type answers to.
pub fn make_net_from_tag(tag: u32, sizes: &[usize]) -> Result<Box<dyn Net>> {
    make_net(NetType::try_from(tag)?, sizes)
}

/// Builds a three-layer network that fits `examples`, with `hidden` nodes
/// in its single hidden layer.
pub fn make_net_for(t: NetType, examples: &ExampleSet<'_>, hidden: usize) -> Result<Box<dyn Net>> {
    make_net(t, &[examples.input_count(), hidden, examples.output_count()])
}

/// Writes the header and parameter block of `net`.
pub fn write_net<W: Write + ?Sized>(w: &mut W, net: &dyn Net) -> Result<()> {
    w.write_u32::<NativeEndian>(net.net_type().tag())?;
    w.write_u32::<NativeEndian>(net.layer_count() as u32)?;
    for n in 0..net.layer_count() {
        w.write_u32::<NativeEndian>(net.layer_size(n) as u32)?;
    }
    for p in net.save() {
        w.write_f64::<NativeEndian>(p)?;
    }
    Ok(())
}

/// Reads a network written by [`write_net`], rebuilding its topology from
/// the header once the whole parameter block has been read.
pub fn read_net<R: Read + ?Sized>(r: &mut R) -> Result<Box<dyn Net>> {
    let tag = r.read_u32::<NativeEndian>()?;
    let t = NetType::try_from(tag)?;
    let count = r.read_u32::<NativeEndian>()? as usize;
    if !(2..=MAX_LAYERS).contains(&count) {
        return Err(NetError::Format(format!("bad layer count {} in header", count)));
    }
    let mut sizes = Vec::with_capacity(count);
    for _ in 0..count {
        let size = r.read_u32::<NativeEndian>()? as usize;
        if !(1..=MAX_LAYER_SIZE).contains(&size) {
            return Err(NetError::Format(format!("bad layer size {} in header", size)));
        }
        sizes.push(size);
    }

    // The block grows with the bytes actually present, so a short file
    // fails here without sizing anything from the header.
    let expected = param_count(t, &sizes);
    let mut bytes = Vec::new();
    Read::take(&mut *r, (expected * 8) as u64).read_to_end(&mut bytes)?;
    if bytes.len() != expected * 8 {
        return Err(NetError::Format(format!(
            "truncated parameter block: expected {} bytes, got {}",
            expected * 8,
            bytes.len()
        )));
    }
    let mut params = vec![0.0; expected];
    NativeEndian::read_f64_into(&bytes, &mut params);

    let mut net = make_net(t, &sizes).map_err(|e| match e {
        NetError::Config(msg) => NetError::Format(msg),
        other => other,
    })?;
    net.load(&params)?;
    debug!(net_type = %t, ?sizes, params = params.len(), "read network");
    Ok(net)
}

/// Parameter count of a network of type `t` with public layer sizes
/// `sizes`, matching `Net::data_size` of the built network.
fn param_count(t: NetType, sizes: &[usize]) -> usize {
    let extra_input = usize::from(t == NetType::HInput);
    let single: usize = sizes
        .windows(2)
        .enumerate()
        .map(|(l, w)| {
            let prev = if l == 0 { w[0] + extra_input } else { w[0] };
            w[1] * (1 + prev)
        })
        .sum();
    if t == NetType::OutputBlending {
        single * 2
    } else {
        single
    }
}

pub fn save_net<P: AsRef<Path>>(path: P, net: &dyn Net) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    write_net(&mut w, net)?;
    w.flush()?;
    Ok(())
}

pub fn load_net<P: AsRef<Path>>(path: P) -> Result<Box<dyn Net>> {
    let mut r = BufReader::new(File::open(path)?);
    read_net(&mut r)
}
