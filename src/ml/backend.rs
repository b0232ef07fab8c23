// ============================================================
// Layer 5 — Backend Selection
// ============================================================
// The device is picked once, before any tensor exists:
//   --gpu ""   → NdArray on the CPU
//   --gpu N    → Wgpu on discrete GPU N
//
// Training wraps either backend in Autodiff.

use anyhow::{Context, Result};
use burn::backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, Autodiff, NdArray, Wgpu};
use serde::{Deserialize, Serialize};

pub type CpuBackend = NdArray;
pub type GpuBackend = Wgpu;

pub type CpuTrainBackend = Autodiff<CpuBackend>;
pub type GpuTrainBackend = Autodiff<GpuBackend>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeviceChoice {
    #[default]
    Cpu,
    Gpu(usize),
}

impl DeviceChoice {
    /// Parse the `--gpu` flag. Empty means CPU only.
    pub fn from_flag(flag: Option<&str>) -> Result<Self> {
        match flag.map(str::trim) {
            None | Some("") => Ok(DeviceChoice::Cpu),
            Some(id) => {
                let index = id
                    .parse::<usize>()
                    .with_context(|| format!("Invalid gpu device id '{id}'"))?;
                Ok(DeviceChoice::Gpu(index))
            }
        }
    }

    pub fn cpu_device() -> NdArrayDevice {
        NdArrayDevice::Cpu
    }

    pub fn gpu_device(index: usize) -> WgpuDevice {
        WgpuDevice::DiscreteGpu(index)
    }
}
