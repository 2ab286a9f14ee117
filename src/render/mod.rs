//! wgpu implementation of the scene renderer.
//!
//! One `RenderContext` lives per window surface. Frames are split in three:
//! `render` acquires the swapchain image and draws the 3D scene,
//! `render_ui` paints egui on top, `end_frame` presents.

use crate::app::EguiFrameOutput;
use crate::model::{linear_rgb, Material, MeshVertex};
use crate::scene::{GridHelper, PerspectiveCamera, Scene, SceneRenderer};
use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use std::sync::Arc;
use wgpu::util::DeviceExt;
use winit::window::Window;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to create surface: {0}")]
    SurfaceCreate(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible GPU adapter found")]
    AdapterUnavailable,
    #[error("failed to create GPU device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
    #[error("surface was outdated and has been reconfigured")]
    SurfaceOutdated,
    #[error("failed to acquire surface texture: {0}")]
    SurfaceAcquire(String),
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct CameraUniforms {
    view_proj: [[f32; 4]; 4],
    light_dir: [f32; 4],
    light_color: [f32; 4],
    ambient: [f32; 4],
}

impl CameraUniforms {
    fn new(scene: &Scene, camera: &PerspectiveCamera) -> Self {
        let to_light = scene.directional.to_light();
        Self {
            view_proj: camera.view_projection().to_cols_array_2d(),
            light_dir: [to_light.x, to_light.y, to_light.z, 0.0],
            light_color: scaled_color(scene.directional.color, scene.directional.intensity),
            ambient: scaled_color(scene.ambient.color, scene.ambient.intensity),
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct ObjectUniforms {
    model: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 4],
    color: [f32; 4],
    emissive: [f32; 4],
}

impl ObjectUniforms {
    fn new(world: Mat4, material: &Material) -> Self {
        Self {
            model: world.to_cols_array_2d(),
            normal_matrix: world.inverse().transpose().to_cols_array_2d(),
            color: scaled_color(material.color, 1.0),
            emissive: scaled_color(material.emissive, material.emissive_intensity),
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
struct GridVertex {
    position: [f32; 3],
    color: [f32; 3],
}

fn scaled_color(packed: u32, intensity: f32) -> [f32; 4] {
    let [r, g, b] = linear_rgb(packed);
    [r * intensity, g * intensity, b * intensity, 1.0]
}

fn grid_vertices(grid: &GridHelper) -> Vec<GridVertex> {
    grid.lines()
        .iter()
        .flat_map(|line| {
            let color = linear_rgb(line.color);
            [
                GridVertex {
                    position: line.from.to_array(),
                    color,
                },
                GridVertex {
                    position: line.to.to_array(),
                    color,
                },
            ]
        })
        .collect()
}

fn clear_color(packed: u32) -> wgpu::Color {
    let [r, g, b] = linear_rgb(packed);
    wgpu::Color {
        r: r as f64,
        g: g as f64,
        b: b as f64,
        a: 1.0,
    }
}

const MESH_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];
const GRID_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

fn mesh_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &MESH_ATTRIBUTES,
    }
}

fn grid_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<GridVertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &GRID_ATTRIBUTES,
    }
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

struct GpuGrid {
    source: GridHelper,
    vertex_buffer: wgpu::Buffer,
    vertex_count: u32,
}

struct PendingFrame {
    surface_texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
}

pub struct RenderContext {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    mesh_pipeline: wgpu::RenderPipeline,
    grid_pipeline: wgpu::RenderPipeline,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    object_layout: wgpu::BindGroupLayout,
    depth_view: wgpu::TextureView,
    meshes: Vec<GpuMesh>,
    mesh_generation: Option<u64>,
    grid: Option<GpuGrid>,
    egui_renderer: egui_wgpu::Renderer,
    clear_color: wgpu::Color,
    frame: Option<PendingFrame>,
}

impl RenderContext {
    pub fn new(window: Arc<Window>, background: u32) -> Result<Self, RenderError> {
        pollster::block_on(Self::new_async(window, background))
    }

    async fn new_async(window: Arc<Window>, background: u32) -> Result<Self, RenderError> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::AdapterUnavailable)?;
        log::info!("Using GPU: {}", adapter.get_info().name);
        log::info!("Backend: {:?}", adapter.get_info().backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Furniture Viewer Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|format| format.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(RenderError::NoSurfaceFormat)?;
        log::info!("Surface format: {:?}", surface_format);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/scene.wgsl").into()),
        });

        let camera_layout = uniform_layout(&device, "Camera Bind Group Layout");
        let object_layout = uniform_layout(&device, "Object Bind Group Layout");

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Camera Buffer"),
            size: std::mem::size_of::<CameraUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let mesh_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[&camera_layout, &object_layout],
            push_constant_ranges: &[],
        });
        let grid_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Grid Pipeline Layout"),
            bind_group_layouts: &[&camera_layout],
            push_constant_ranges: &[],
        });

        let mesh_pipeline = create_pipeline(
            &device,
            PipelineSpec {
                label: "Mesh Pipeline",
                layout: &mesh_pipeline_layout,
                shader: &shader,
                vertex_entry: "vs_main",
                fragment_entry: "fs_main",
                vertex_layout: mesh_vertex_layout(),
                topology: wgpu::PrimitiveTopology::TriangleList,
                format: surface_format,
            },
        );
        let grid_pipeline = create_pipeline(
            &device,
            PipelineSpec {
                label: "Grid Pipeline",
                layout: &grid_pipeline_layout,
                shader: &shader,
                vertex_entry: "vs_grid",
                fragment_entry: "fs_grid",
                vertex_layout: grid_vertex_layout(),
                topology: wgpu::PrimitiveTopology::LineList,
                format: surface_format,
            },
        );

        let depth_view = create_depth_view(&device, config.width, config.height);
        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            mesh_pipeline,
            grid_pipeline,
            camera_buffer,
            camera_bind_group,
            object_layout,
            depth_view,
            meshes: Vec::new(),
            mesh_generation: None,
            grid: None,
            egui_renderer,
            clear_color: clear_color(background),
            frame: None,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if width == self.config.width && height == self.config.height {
            return;
        }
        // An image acquired for the old size must not be presented.
        self.frame = None;
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_view = create_depth_view(&self.device, width, height);
        log::debug!("Surface resized to {}x{}", width, height);
    }

    /// Paints egui over the frame acquired by `render`. Texture updates are
    /// applied even when no frame is pending so egui's atlas stays in sync.
    pub fn render_ui(&mut self, output: EguiFrameOutput) {
        for (id, image_delta) in &output.textures_delta.set {
            self.egui_renderer
                .update_texture(&self.device, &self.queue, *id, image_delta);
        }

        if let Some(frame) = &self.frame {
            let screen_descriptor = egui_wgpu::ScreenDescriptor {
                size_in_pixels: [self.config.width, self.config.height],
                pixels_per_point: output.pixels_per_point,
            };
            let mut encoder = self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("egui Encoder"),
                });
            let user_buffers = self.egui_renderer.update_buffers(
                &self.device,
                &self.queue,
                &mut encoder,
                &output.clipped_primitives,
                &screen_descriptor,
            );
            {
                let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &frame.view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });
                self.egui_renderer.render(
                    &mut render_pass.forget_lifetime(),
                    &output.clipped_primitives,
                    &screen_descriptor,
                );
            }
            self.queue
                .submit(user_buffers.into_iter().chain(std::iter::once(encoder.finish())));
        }

        for id in &output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }

    fn acquire_frame(&mut self) -> Result<(), RenderError> {
        self.frame = None;
        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return Err(RenderError::SurfaceOutdated);
            }
            Err(err) => return Err(RenderError::SurfaceAcquire(err.to_string())),
        };
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.frame = Some(PendingFrame {
            surface_texture,
            view,
        });
        Ok(())
    }

    fn sync_meshes(&mut self, scene: &Scene) {
        if self.mesh_generation == Some(scene.model_generation()) {
            return;
        }
        self.meshes.clear();
        if let Some(model) = scene.model() {
            for node in model.meshes() {
                let data = node.primitive.tessellate();
                let vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(node.name),
                    contents: bytemuck::cast_slice(&data.vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                });
                let index_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(node.name),
                    contents: bytemuck::cast_slice(&data.indices),
                    usage: wgpu::BufferUsages::INDEX,
                });
                let uniform_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("Object Buffer"),
                    size: std::mem::size_of::<ObjectUniforms>() as u64,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Object Bind Group"),
                    layout: &self.object_layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniform_buffer.as_entire_binding(),
                    }],
                });
                self.meshes.push(GpuMesh {
                    vertex_buffer,
                    index_buffer,
                    index_count: data.indices.len() as u32,
                    uniform_buffer,
                    bind_group,
                });
            }
            log::debug!(
                "Uploaded {} meshes for '{}'",
                self.meshes.len(),
                model.name()
            );
        }
        self.mesh_generation = Some(scene.model_generation());
    }

    fn sync_grid(&mut self, grid: &GridHelper) {
        if self.grid.as_ref().is_some_and(|gpu| gpu.source == *grid) {
            return;
        }
        let vertices = grid_vertices(grid);
        let vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Grid Vertex Buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        self.grid = Some(GpuGrid {
            source: *grid,
            vertex_buffer,
            vertex_count: vertices.len() as u32,
        });
    }
}

impl SceneRenderer for RenderContext {
    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), RenderError> {
        self.acquire_frame()?;
        self.sync_meshes(scene);
        self.sync_grid(&scene.grid);

        self.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::bytes_of(&CameraUniforms::new(scene, camera)),
        );
        if let Some(model) = scene.model() {
            for (node, gpu) in model.meshes().iter().zip(&self.meshes) {
                let Some(material) = model.material(node.material) else {
                    continue;
                };
                let uniforms = ObjectUniforms::new(model.world_matrix(node), material);
                self.queue
                    .write_buffer(&gpu.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
            }
        }

        let Some(frame) = &self.frame else {
            return Err(RenderError::SurfaceAcquire("no frame acquired".to_string()));
        };
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Scene Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
            if let Some(grid) = &self.grid {
                render_pass.set_pipeline(&self.grid_pipeline);
                render_pass.set_vertex_buffer(0, grid.vertex_buffer.slice(..));
                render_pass.draw(0..grid.vertex_count, 0..1);
            }

            render_pass.set_pipeline(&self.mesh_pipeline);
            for mesh in &self.meshes {
                render_pass.set_bind_group(1, &mesh.bind_group, &[]);
                render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn drawable_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn end_frame(&mut self) {
        if let Some(frame) = self.frame.take() {
            self.window.pre_present_notify();
            frame.surface_texture.present();
        }
    }
}

fn uniform_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

struct PipelineSpec<'a> {
    label: &'a str,
    layout: &'a wgpu::PipelineLayout,
    shader: &'a wgpu::ShaderModule,
    vertex_entry: &'a str,
    fragment_entry: &'a str,
    vertex_layout: wgpu::VertexBufferLayout<'static>,
    topology: wgpu::PrimitiveTopology,
    format: wgpu::TextureFormat,
}

fn create_pipeline(device: &wgpu::Device, spec: PipelineSpec<'_>) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(spec.label),
        layout: Some(spec.layout),
        vertex: wgpu::VertexState {
            module: spec.shader,
            entry_point: Some(spec.vertex_entry),
            buffers: &[spec.vertex_layout],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: spec.shader,
            entry_point: Some(spec.fragment_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format: spec.format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: spec.topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // Open-ended shades must show their inside.
            cull_mode: None,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn uniform_structs_are_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<CameraUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<ObjectUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<MeshVertex>(), 24);
    }

    #[test]
    fn grid_lines_become_vertex_pairs() {
        let grid = GridHelper {
            size: 10.0,
            divisions: 10,
            center_color: 0x444444,
            line_color: 0x888888,
        };
        let vertices = grid_vertices(&grid);
        assert_eq!(vertices.len(), grid.lines().len() * 2);
        assert!(vertices.iter().all(|v| v.position[1] == 0.0));
    }

    #[test]
    fn emissive_is_scaled_by_intensity() {
        let dark = ObjectUniforms::new(Mat4::IDENTITY, &Material::standard(0x2F6FDB));
        assert_eq!(dark.emissive[..3], [0.0, 0.0, 0.0]);
        let bulb = ObjectUniforms::new(Mat4::IDENTITY, &Material::glowing(0xFFFFFF));
        assert_eq!(bulb.emissive, [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn normal_matrix_keeps_rotated_normals_unit_length() {
        let world = Mat4::from_rotation_y(0.7) * Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let uniforms = ObjectUniforms::new(world, &Material::standard(0xFFFFFF));
        let normal_matrix = Mat4::from_cols_array_2d(&uniforms.normal_matrix);
        let n = normal_matrix.transform_vector3(Vec3::Y);
        assert!((n.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn background_is_converted_to_linear() {
        let color = clear_color(0xFFFFFF);
        assert_eq!((color.r, color.g, color.b, color.a), (1.0, 1.0, 1.0, 1.0));
    }
}
