// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! PICARX dump tool
//!
//! Decodes a texture or a screen framebuffer out of a raw memory dump and
//! writes it as a PNG. Decoding goes through the same cache and display paths
//! the renderer uses, on the software host.
//!
//! ```text
//! picarx-dump vram.bin --base 0x18000000 texture --address 0x18000000 \
//!     --width 128 --height 128 --format rgb565 --output tex.png
//! ```
//!
//! Environment (also read from `.env`):
//! - `PICARX_CONFIG`: renderer configuration file used when `--config` is absent
//! - `RUST_LOG`: log filter

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use picarx::core::config::RendererConfig;
use picarx::core::gpu::{
    CacheStats, DisplayPresenter, HostCounters, PixelFormat, ResourceCache, Rgba8,
    ScreenFramebufferConfig, SoftwareHost, TextureHandle, TextureRegisters,
};
use picarx::core::memory::PhysicalMemory;
use picarx::EmulatorError;

#[derive(Parser, Debug)]
#[command(
    name = "picarx-dump",
    about = "Decode PICA200 textures and framebuffers from a raw memory dump into PNG images."
)]
struct Args {
    /// Raw memory dump
    dump: PathBuf,

    /// Physical address the dump starts at
    #[arg(long, value_name = "ADDR", value_parser = parse_address, default_value = "0x18000000")]
    base: u32,

    /// Renderer configuration file (defaults to $PICARX_CONFIG)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode a texture as the texture units see it
    Texture(ImageArgs),
    /// Decode a screen framebuffer as the display controller sees it
    Framebuffer(ImageArgs),
}

#[derive(clap::Args, Debug)]
struct ImageArgs {
    /// Physical address of the image
    #[arg(long, value_name = "ADDR", value_parser = parse_address)]
    address: u32,

    /// Width in pixels
    #[arg(long)]
    width: u16,

    /// Height in pixels
    #[arg(long)]
    height: u16,

    /// Pixel format
    #[arg(long, value_enum, default_value_t = FormatArg::Rgba8)]
    format: FormatArg,

    /// Output PNG path
    #[arg(long, short, value_name = "PATH")]
    output: PathBuf,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Rgba8,
    Rgb8,
    Rgb565,
    Rgb5a1,
    Rgba4,
}

impl From<FormatArg> for PixelFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Rgba8 => PixelFormat::Rgba8,
            FormatArg::Rgb8 => PixelFormat::Rgb8,
            FormatArg::Rgb565 => PixelFormat::Rgb565,
            FormatArg::Rgb5a1 => PixelFormat::Rgb5A1,
            FormatArg::Rgba4 => PixelFormat::Rgba4,
        }
    }
}

/// Printed to stdout after a successful dump
#[derive(Debug, Serialize)]
struct DumpReport {
    output: PathBuf,
    width: u16,
    height: u16,
    format: PixelFormat,
    cache: Option<CacheStats>,
    host: HostCounters,
}

/// Parse a decimal or `0x`-prefixed hexadecimal address
fn parse_address(value: &str) -> Result<u32, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(&hex.replace('_', ""), 16),
        None => value.replace('_', "").parse(),
    };
    parsed.map_err(|e| format!("invalid address '{}': {}", value, e))
}

fn load_config(path: Option<PathBuf>) -> Result<RendererConfig, EmulatorError> {
    let path = path.or_else(|| std::env::var_os("PICARX_CONFIG").map(PathBuf::from));
    match path {
        Some(path) => {
            log::info!("Loading renderer config from {}", path.display());
            RendererConfig::load(path)
        }
        None => Ok(RendererConfig::default()),
    }
}

fn save_png(
    host: &SoftwareHost,
    handle: TextureHandle,
    target: &ImageArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let pixels: &[Rgba8] = host
        .texture_pixels(handle)
        .ok_or(EmulatorError::InvalidHandle(handle.0))?;

    let buffer = image::RgbaImage::from_raw(
        u32::from(target.width),
        u32::from(target.height),
        bytemuck::cast_slice(pixels).to_vec(),
    )
    .ok_or(EmulatorError::BufferSize {
        expected: usize::from(target.width) * usize::from(target.height) * 4,
        actual: pixels.len() * 4,
    })?;

    buffer.save(&target.output).map_err(EmulatorError::from)?;
    log::info!("Wrote {}", target.output.display());
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();
    let config = load_config(args.config)?;

    let data = std::fs::read(&args.dump)?;
    log::info!(
        "Loaded {} ({:#x} bytes) at {:#010x}",
        args.dump.display(),
        data.len(),
        args.base
    );

    let mut memory = PhysicalMemory::new();
    memory.map_region(args.base, data);
    let mut host = SoftwareHost::new();

    let (target, handle, cache) = match &args.command {
        Command::Texture(image) => {
            if image.address % 8 != 0 {
                return Err(
                    format!("texture address {:#x} is not 8-byte aligned", image.address).into(),
                );
            }

            let regs = TextureRegisters {
                enabled: true,
                address: image.address / 8,
                width: image.width,
                height: image.height,
                wrap_s: 0,
                wrap_t: 0,
                format: PixelFormat::from(image.format).to_pica_raw(),
            };

            let mut cache = ResourceCache::with_filter(config.texture_filter);
            let handle = cache.acquire_texture(&mut host, &memory, &regs)?;
            (image, handle, Some(cache.stats()))
        }
        Command::Framebuffer(image) => {
            let format = PixelFormat::from(image.format);
            let screen = ScreenFramebufferConfig {
                address_left1: image.address,
                address_left2: image.address,
                active_fb: 0,
                width: u32::from(image.width),
                height: u32::from(image.height),
                color_format: format.to_lcd_raw(),
                stride: u32::from(image.width) * format.bytes_per_pixel(),
            };

            let mut presenter = DisplayPresenter::new();
            presenter.refresh(&mut host, &memory, &[screen, ScreenFramebufferConfig::default()])?;
            let handle = presenter
                .screen_texture(0)
                .ok_or("framebuffer has zero size")?;
            (image, handle, None)
        }
    };

    save_png(&host, handle, target)?;

    let report = DumpReport {
        output: target.output.clone(),
        width: target.width,
        height: target.height,
        format: target.format.into(),
        cache,
        host: host.counters(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
