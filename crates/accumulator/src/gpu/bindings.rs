use crate::error::RendererError;

use super::backend::{BindingResources, GpuBackend};
use super::textures::AccumulationTextureSet;

/// Which accumulation texture a frame reads and which it writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureRoles {
    pub history: usize,
    pub target: usize,
}

/// Parity of `frame_index`, used to pick the bind group.
pub fn select(frame_index: u32) -> usize {
    (frame_index % 2) as usize
}

/// Roles for the bind group at `parity`: set 0 reads texture 0 and writes
/// texture 1, set 1 the reverse. Frame K writes what frame K+1 reads.
pub fn roles(parity: usize) -> TextureRoles {
    TextureRoles {
        history: parity,
        target: 1 - parity,
    }
}

enum BindGroups<B: GpuBackend> {
    /// Uniform-only layout: one group serves both parities.
    Single(B::BindGroup),
    PingPong([B::BindGroup; 2]),
}

/// The precomputed bind groups for one texture pair. Built at initialization
/// or resize, never per frame.
pub struct BindGroupRotator<B: GpuBackend> {
    groups: BindGroups<B>,
}

impl<B: GpuBackend> BindGroupRotator<B> {
    pub fn build(
        backend: &B,
        layout: &B::BindGroupLayout,
        uniform_buffer: &B::Buffer,
        textures: Option<&AccumulationTextureSet<B>>,
    ) -> Result<Self, RendererError> {
        let groups = match textures {
            None => BindGroups::Single(backend.create_bind_group(
                "display bind group",
                layout,
                &BindingResources {
                    uniforms: uniform_buffer,
                    history: None,
                    target: None,
                },
            )?),
            Some(textures) => {
                let build = |parity: usize, label: &'static str| {
                    let roles = roles(parity);
                    backend.create_bind_group(
                        label,
                        layout,
                        &BindingResources {
                            uniforms: uniform_buffer,
                            history: Some(textures.view(roles.history)),
                            target: Some(textures.view(roles.target)),
                        },
                    )
                };
                BindGroups::PingPong([
                    build(0, "display bind group (even)")?,
                    build(1, "display bind group (odd)")?,
                ])
            }
        };
        Ok(Self { groups })
    }

    /// Bind group for the frame numbered `frame_index`.
    pub fn bind_group(&self, frame_index: u32) -> &B::BindGroup {
        match &self.groups {
            BindGroups::Single(group) => group,
            BindGroups::PingPong(groups) => &groups[select(frame_index)],
        }
    }

    pub fn is_ping_pong(&self) -> bool {
        matches!(self.groups, BindGroups::PingPong(_))
    }
}
