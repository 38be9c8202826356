//! In-memory emulation of the native API.
//!
//! [`HeadlessGl`] implements [`GlInterface`] without a driver: objects live in hash
//! maps, textures and renderbuffers hold real pixel storage, and framebuffer
//! operations (clears, blits, `glReadPixels`, `glCopyTexSubImage2D`) move bytes between
//! them. It does not rasterize; draw calls are validated and counted only.
//!
//! Profiles mirror the capability levels the GPU layer distinguishes between
//! (desktop GL, GLES 2/3, WebGL 1/2). Entry points that a profile would not expose
//! without an extension stay unresolved until that extension is added, and any entry
//! point can be removed outright to exercise fallbacks. Calls to unresolved entry
//! points are no-ops that are counted separately, so tests can assert that no code
//! path calls through a missing pointer.
//!
//! ```rust,ignore
//! let gl = Arc::new(HeadlessGl::gles(2).with_extension("GL_OES_vertex_array_object"));
//! let device = Device::new(gl.clone(), DeviceSettings::default())?;
//! // ...
//! assert_eq!(gl.call_count("glBindTexture"), 1);
//! assert_eq!(gl.unresolved_calls(), 0);
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};

use super::consts::{
    GLbitfield, GLenum, GLint, GLuint, GLuint64, GL_ALPHA, GL_ALREADY_SIGNALED, GL_ARRAY_BUFFER, GL_BGRA,
    GL_COLOR_ATTACHMENT0, GL_COLOR_BUFFER_BIT, GL_COMPILE_STATUS, GL_DEPTH_ATTACHMENT, GL_DEPTH_BUFFER_BIT,
    GL_DEPTH_STENCIL, GL_DEPTH_STENCIL_ATTACHMENT, GL_DRAW_FRAMEBUFFER, GL_ELEMENT_ARRAY_BUFFER, GL_EXTENSIONS,
    GL_FLOAT, GL_FRAMEBUFFER_COMPLETE, GL_FRAMEBUFFER_INCOMPLETE_ATTACHMENT,
    GL_FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT, GL_FRAMEBUFFER_UNSUPPORTED, GL_HALF_FLOAT, GL_HALF_FLOAT_OES,
    GL_INFO_LOG_LENGTH, GL_INVALID_ENUM, GL_INVALID_INDEX, GL_INVALID_OPERATION, GL_INVALID_VALUE, GL_LINK_STATUS,
    GL_LUMINANCE, GL_LUMINANCE8, GL_LUMINANCE_ALPHA, GL_MAP_WRITE_BIT, GL_MAX_SAMPLES,
    GL_MAX_TEXTURE_IMAGE_UNITS, GL_MAX_TEXTURE_SIZE, GL_MAX_VERTEX_ATTRIBS, GL_NO_ERROR, GL_NUM_EXTENSIONS,
    GL_OUT_OF_MEMORY, GL_PACK_ROW_LENGTH, GL_PIXEL_PACK_BUFFER, GL_READ_FRAMEBUFFER, GL_RED, GL_RENDERER, GL_RG,
    GL_RGBA, GL_SCISSOR_TEST, GL_STENCIL_ATTACHMENT, GL_STENCIL_BUFFER_BIT, GL_TEXTURE0,
    GL_UNPACK_ROW_LENGTH, GL_UNSIGNED_BYTE, GL_UNSIGNED_INT_24_8, GL_VENDOR, GL_VERSION, GL_VERTEX_SHADER,
    GL_WAIT_FAILED,
};
use super::interface::{GlInterface, GlSync};
use super::version::{GlStandard, GlVersion};

/// Last value uploaded to a uniform location.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Float(Vec<f32>),
    Int(Vec<i32>),
}

// ─── Emulated Objects ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Image {
    width: u32,
    height: u32,
    bpp: usize,
    internal_format: GLenum,
    samples: u32,
    data: Vec<u8>,
}

impl Image {
    fn new(width: u32, height: u32, bpp: usize, internal_format: GLenum, samples: u32) -> Self {
        Self {
            width,
            height,
            bpp,
            internal_format,
            samples,
            data: vec![0; width as usize * height as usize * bpp],
        }
    }

    fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < i64::from(self.width) && y < i64::from(self.height)
    }

    fn offset(&self, x: i64, y: i64) -> usize {
        (y as usize * self.width as usize + x as usize) * self.bpp
    }

    fn pixel(&self, x: i64, y: i64) -> &[u8] {
        let start = self.offset(x, y);
        &self.data[start..start + self.bpp]
    }

    fn set_pixel(&mut self, x: i64, y: i64, pixel: &[u8]) {
        let start = self.offset(x, y);
        self.data[start..start + self.bpp].copy_from_slice(pixel);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attachment {
    Texture { name: GLuint, level: usize },
    Renderbuffer(GLuint),
}

#[derive(Debug, Default)]
struct Framebuffer {
    color: Option<Attachment>,
    depth_stencil: Option<Attachment>,
}

#[derive(Debug)]
struct Mapping {
    offset: usize,
    access: GLbitfield,
    staging: Vec<u8>,
}

#[derive(Debug, Default)]
struct BufferObject {
    data: Vec<u8>,
    mapping: Option<Mapping>,
}

#[derive(Debug, Default)]
struct TextureObject {
    target: GLenum,
    levels: Vec<Option<Image>>,
    params: FxHashMap<GLenum, GLint>,
}

#[derive(Debug)]
struct ShaderObject {
    ty: GLenum,
    source: String,
    compiled: bool,
    log: String,
}

#[derive(Debug, Default)]
struct ProgramObject {
    shaders: Vec<GLuint>,
    linked: bool,
    log: String,
    sources: Vec<String>,
    attrib_bindings: FxHashMap<String, u32>,
    locations: FxHashMap<String, GLint>,
    block_indices: FxHashMap<String, GLuint>,
    block_bindings: FxHashMap<GLuint, GLuint>,
    values: FxHashMap<GLint, UniformValue>,
}

impl ProgramObject {
    fn mentions(&self, name: &str) -> bool {
        self.sources.iter().any(|source| source.contains(name))
    }
}

#[derive(Debug)]
struct Emulation {
    next_name: GLuint,
    error: GLenum,

    buffers: FxHashMap<GLuint, BufferObject>,
    textures: FxHashMap<GLuint, TextureObject>,
    renderbuffers: FxHashMap<GLuint, Image>,
    framebuffers: FxHashMap<GLuint, Framebuffer>,
    shaders: FxHashMap<GLuint, ShaderObject>,
    programs: FxHashMap<GLuint, ProgramObject>,
    samplers: FxHashMap<GLuint, FxHashMap<GLenum, GLint>>,
    vertex_arrays: FxHashSet<GLuint>,
    syncs: FxHashSet<usize>,
    next_sync: usize,

    buffer_bindings: FxHashMap<GLenum, GLuint>,
    active_unit: u32,
    texture_bindings: FxHashMap<(u32, GLenum), GLuint>,
    sampler_bindings: FxHashMap<u32, GLuint>,
    read_framebuffer: GLuint,
    draw_framebuffer: GLuint,
    renderbuffer: GLuint,
    program: GLuint,
    vertex_array: GLuint,
    pixel_store: FxHashMap<GLenum, GLint>,
    enabled: FxHashSet<GLenum>,
    enabled_attributes: FxHashSet<u32>,
    scissor: [GLint; 4],
    viewport: [GLint; 4],
    clear_color: [f32; 4],
    clear_stencil: GLint,
    default_surface: Option<Image>,
}

impl Emulation {
    fn new(default_surface: Option<Image>) -> Self {
        Self {
            next_name: 1,
            error: GL_NO_ERROR,
            buffers: FxHashMap::default(),
            textures: FxHashMap::default(),
            renderbuffers: FxHashMap::default(),
            framebuffers: FxHashMap::default(),
            shaders: FxHashMap::default(),
            programs: FxHashMap::default(),
            samplers: FxHashMap::default(),
            vertex_arrays: FxHashSet::default(),
            syncs: FxHashSet::default(),
            next_sync: 0x1000,
            buffer_bindings: FxHashMap::default(),
            active_unit: 0,
            texture_bindings: FxHashMap::default(),
            sampler_bindings: FxHashMap::default(),
            read_framebuffer: 0,
            draw_framebuffer: 0,
            renderbuffer: 0,
            program: 0,
            vertex_array: 0,
            pixel_store: FxHashMap::default(),
            enabled: FxHashSet::default(),
            enabled_attributes: FxHashSet::default(),
            scissor: [0; 4],
            viewport: [0; 4],
            clear_color: [0.0; 4],
            clear_stencil: 0,
            default_surface,
        }
    }

    /// The first error sticks until it is queried.
    fn set_error(&mut self, error: GLenum) {
        if self.error == GL_NO_ERROR {
            self.error = error;
        }
    }

    fn gen_name(&mut self) -> GLuint {
        let name = self.next_name;
        self.next_name += 1;
        name
    }

    fn bound_buffer(&self, target: GLenum) -> GLuint {
        self.buffer_bindings.get(&target).copied().unwrap_or(0)
    }

    fn bound_texture(&self, target: GLenum) -> GLuint {
        self.texture_bindings.get(&(self.active_unit, target)).copied().unwrap_or(0)
    }

    fn bound_framebuffer(&self, target: GLenum) -> GLuint {
        if target == GL_READ_FRAMEBUFFER { self.read_framebuffer } else { self.draw_framebuffer }
    }

    fn row_length(&self, pname: GLenum, width: GLint) -> usize {
        let configured = self.pixel_store.get(&pname).copied().unwrap_or(0);
        if configured > 0 { configured as usize } else { width.max(0) as usize }
    }

    fn attachment_image(&self, attachment: Attachment) -> Option<&Image> {
        match attachment {
            Attachment::Texture { name, level } => self.textures.get(&name)?.levels.get(level)?.as_ref(),
            Attachment::Renderbuffer(name) => self.renderbuffers.get(&name),
        }
    }

    fn attachment_image_mut(&mut self, attachment: Attachment) -> Option<&mut Image> {
        match attachment {
            Attachment::Texture { name, level } => self.textures.get_mut(&name)?.levels.get_mut(level)?.as_mut(),
            Attachment::Renderbuffer(name) => self.renderbuffers.get_mut(&name),
        }
    }

    fn color_image(&self, framebuffer: GLuint) -> Option<&Image> {
        if framebuffer == 0 {
            return self.default_surface.as_ref();
        }
        let attachment = self.framebuffers.get(&framebuffer)?.color?;
        self.attachment_image(attachment)
    }

    fn color_image_mut(&mut self, framebuffer: GLuint) -> Option<&mut Image> {
        if framebuffer == 0 {
            return self.default_surface.as_mut();
        }
        let attachment = self.framebuffers.get(&framebuffer)?.color?;
        self.attachment_image_mut(attachment)
    }

    fn current_program_mut(&mut self) -> Option<&mut ProgramObject> {
        let program = self.program;
        self.programs.get_mut(&program).filter(|p| p.linked)
    }

    /// Copies a client-memory rectangle (rows `row_length` pixels apart) into `image`.
    fn write_region(image: &mut Image, x: i64, y: i64, width: usize, height: usize, row_length: usize, src: &[u8]) {
        let bpp = image.bpp;
        for row in 0..height {
            for col in 0..width {
                let (dx, dy) = (x + col as i64, y + row as i64);
                let start = (row * row_length + col) * bpp;
                if image.contains(dx, dy) && start + bpp <= src.len() {
                    image.set_pixel(dx, dy, &src[start..start + bpp]);
                }
            }
        }
    }

    /// Copies a rectangle of `image` into memory with rows `row_length` pixels apart.
    fn read_region(image: &Image, x: i64, y: i64, width: usize, height: usize, row_length: usize, dst: &mut [u8]) {
        let bpp = image.bpp;
        for row in 0..height {
            for col in 0..width {
                let (sx, sy) = (x + col as i64, y + row as i64);
                let start = (row * row_length + col) * bpp;
                if image.contains(sx, sy) && start + bpp <= dst.len() {
                    dst[start..start + bpp].copy_from_slice(image.pixel(sx, sy));
                }
            }
        }
    }

    fn unbind_deleted(&mut self, name: GLuint) {
        self.buffer_bindings.retain(|_, bound| *bound != name);
        self.texture_bindings.retain(|_, bound| *bound != name);
    }
}

// ─── Pixel Helpers ───────────────────────────────────────────────────────────

fn transfer_bpp(format: GLenum, ty: GLenum) -> Option<usize> {
    let channels = match format {
        GL_ALPHA | GL_LUMINANCE | GL_RED => 1,
        GL_LUMINANCE_ALPHA | GL_RG => 2,
        GL_RGBA | GL_BGRA => 4,
        GL_DEPTH_STENCIL if ty == GL_UNSIGNED_INT_24_8 => return Some(4),
        _ => return None,
    };
    let size = match ty {
        GL_UNSIGNED_BYTE => 1,
        GL_HALF_FLOAT | GL_HALF_FLOAT_OES => 2,
        GL_FLOAT => 4,
        _ => return None,
    };
    Some(channels * size)
}

fn renderbuffer_bpp(internal_format: GLenum) -> Option<usize> {
    use super::consts::{GL_ALPHA8, GL_BGRA8, GL_DEPTH24_STENCIL8, GL_R8, GL_RG8, GL_RGBA8, GL_RGBA16F};
    match internal_format {
        GL_R8 | GL_ALPHA8 | GL_LUMINANCE8 => Some(1),
        GL_RG8 => Some(2),
        GL_RGBA8 | GL_BGRA8 | GL_DEPTH24_STENCIL8 | GL_DEPTH_STENCIL => Some(4),
        GL_RGBA16F => Some(8),
        _ => None,
    }
}

fn is_color_renderable(internal_format: GLenum) -> bool {
    !matches!(internal_format, GL_ALPHA | GL_LUMINANCE | GL_LUMINANCE_ALPHA | GL_LUMINANCE8)
}

fn f32_to_f16_bits(value: f32) -> u16 {
    let bits = value.to_bits();
    let sign = ((bits >> 16) & 0x8000) as u16;
    let exponent = ((bits >> 23) & 0xFF) as i32 - 127 + 15;
    let mantissa = bits & 0x007F_FFFF;
    if value == 0.0 || exponent <= 0 {
        sign
    } else if exponent >= 0x1F {
        sign | 0x7C00
    } else {
        sign | ((exponent as u16) << 10) | (mantissa >> 13) as u16
    }
}

fn encode_clear_color(internal_format: GLenum, bpp: usize, color: [f32; 4]) -> Vec<u8> {
    let unorm = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    let [r, g, b, a] = color;
    match (internal_format, bpp) {
        (GL_ALPHA | super::consts::GL_ALPHA8, 1) => vec![unorm(a)],
        (_, 1) => vec![unorm(r)],
        (_, 2) => vec![unorm(r), unorm(g)],
        (GL_BGRA | super::consts::GL_BGRA8, 4) => vec![unorm(b), unorm(g), unorm(r), unorm(a)],
        (_, 4) => vec![unorm(r), unorm(g), unorm(b), unorm(a)],
        (_, 8) => color.iter().flat_map(|&c| f32_to_f16_bits(c).to_le_bytes()).collect(),
        _ => vec![0; bpp],
    }
}

// ─── Profile ─────────────────────────────────────────────────────────────────

/// In-memory implementation of [`GlInterface`] with call accounting.
pub struct HeadlessGl {
    version: GlVersion,
    version_string: String,
    extensions: Vec<String>,
    removed_entry_points: FxHashSet<String>,
    max_samples: GLint,
    max_texture_size: GLint,

    fail_allocations: AtomicBool,
    incomplete_framebuffers: AtomicBool,
    out_of_memory: AtomicBool,

    emulation: Mutex<Emulation>,
    counters: Mutex<FxHashMap<&'static str, u64>>,
    unresolved: AtomicU64,
}

impl std::fmt::Debug for HeadlessGl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessGl")
            .field("version", &self.version)
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}

impl HeadlessGl {
    fn with_version(version: GlVersion, version_string: String) -> Self {
        Self {
            version,
            version_string,
            extensions: Vec::new(),
            removed_entry_points: FxHashSet::default(),
            max_samples: 4,
            max_texture_size: 4096,
            fail_allocations: AtomicBool::new(false),
            incomplete_framebuffers: AtomicBool::new(false),
            out_of_memory: AtomicBool::new(false),
            emulation: Mutex::new(Emulation::new(None)),
            counters: Mutex::new(FxHashMap::default()),
            unresolved: AtomicU64::new(0),
        }
    }

    /// Desktop OpenGL `major.minor`.
    #[must_use]
    pub fn desktop_gl(major: u32, minor: u32) -> Self {
        Self::with_version(GlVersion::new(GlStandard::Gl, major, minor), format!("{major}.{minor}.0 Headless"))
    }

    /// OpenGL ES `major.0`.
    #[must_use]
    pub fn gles(major: u32) -> Self {
        Self::with_version(GlVersion::new(GlStandard::Gles, major, 0), format!("OpenGL ES {major}.0 Headless"))
    }

    /// WebGL `major.0`, reporting the ES version it is layered on.
    #[must_use]
    pub fn webgl(major: u32) -> Self {
        let es = major + 1;
        Self::with_version(
            GlVersion::new(GlStandard::WebGl, major, 0),
            format!("WebGL {major}.0 (OpenGL ES {es}.0 Headless)"),
        )
    }

    #[must_use]
    pub fn with_extension(mut self, name: &str) -> Self {
        self.extensions.push(name.to_owned());
        self
    }

    /// Leaves `name` (canonical name) unresolved regardless of profile.
    #[must_use]
    pub fn without_entry_point(mut self, name: &str) -> Self {
        self.removed_entry_points.insert(name.to_owned());
        self
    }

    #[must_use]
    pub fn with_max_samples(mut self, samples: u32) -> Self {
        self.max_samples = samples as GLint;
        self
    }

    /// Gives framebuffer `0` an RGBA8 color surface of the given size.
    #[must_use]
    pub fn with_default_framebuffer(self, width: u32, height: u32) -> Self {
        use super::consts::GL_RGBA8;
        self.emulation.lock().default_surface = Some(Image::new(width, height, 4, GL_RGBA8, 1));
        self
    }

    // ── Fault Injection ──────────────────────────────────────────────────────

    /// Makes every object-generation call return `0`.
    pub fn set_fail_allocations(&self, fail: bool) {
        self.fail_allocations.store(fail, Ordering::Relaxed);
    }

    /// Makes every framebuffer completeness check fail.
    pub fn set_incomplete_framebuffers(&self, incomplete: bool) {
        self.incomplete_framebuffers.store(incomplete, Ordering::Relaxed);
    }

    /// Makes storage allocations raise `GL_OUT_OF_MEMORY` without allocating.
    pub fn set_out_of_memory(&self, oom: bool) {
        self.out_of_memory.store(oom, Ordering::Relaxed);
    }

    // ── Accounting ───────────────────────────────────────────────────────────

    /// Number of calls made to `name` (canonical entry point name), resolved or not.
    #[must_use]
    pub fn call_count(&self, name: &str) -> u64 {
        self.counters.lock().get(name).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total_calls(&self) -> u64 {
        self.counters.lock().values().sum()
    }

    /// Calls made to object-generation entry points.
    #[must_use]
    pub fn allocation_calls(&self) -> u64 {
        const GENERATORS: [&str; 9] = [
            "glGenBuffers",
            "glGenTextures",
            "glGenFramebuffers",
            "glGenRenderbuffers",
            "glGenSamplers",
            "glGenVertexArrays",
            "glCreateShader",
            "glCreateProgram",
            "glFenceSync",
        ];
        let counters = self.counters.lock();
        GENERATORS.iter().filter_map(|name| counters.get(name)).sum()
    }

    /// Calls that reached an entry point the profile does not resolve.
    #[must_use]
    pub fn unresolved_calls(&self) -> u64 {
        self.unresolved.load(Ordering::Relaxed)
    }

    pub fn reset_counters(&self) {
        self.counters.lock().clear();
        self.unresolved.store(0, Ordering::Relaxed);
    }

    // ── Inspection ───────────────────────────────────────────────────────────

    #[must_use]
    pub fn live_buffers(&self) -> usize {
        self.emulation.lock().buffers.len()
    }

    #[must_use]
    pub fn live_textures(&self) -> usize {
        self.emulation.lock().textures.len()
    }

    #[must_use]
    pub fn live_renderbuffers(&self) -> usize {
        self.emulation.lock().renderbuffers.len()
    }

    #[must_use]
    pub fn live_framebuffers(&self) -> usize {
        self.emulation.lock().framebuffers.len()
    }

    #[must_use]
    pub fn live_shaders(&self) -> usize {
        self.emulation.lock().shaders.len()
    }

    #[must_use]
    pub fn live_programs(&self) -> usize {
        self.emulation.lock().programs.len()
    }

    #[must_use]
    pub fn live_samplers(&self) -> usize {
        self.emulation.lock().samplers.len()
    }

    #[must_use]
    pub fn live_syncs(&self) -> usize {
        self.emulation.lock().syncs.len()
    }

    #[must_use]
    pub fn is_texture(&self, name: GLuint) -> bool {
        self.emulation.lock().textures.contains_key(&name)
    }

    #[must_use]
    pub fn is_framebuffer(&self, name: GLuint) -> bool {
        self.emulation.lock().framebuffers.contains_key(&name)
    }

    #[must_use]
    pub fn is_buffer(&self, name: GLuint) -> bool {
        self.emulation.lock().buffers.contains_key(&name)
    }

    #[must_use]
    pub fn buffer_contents(&self, name: GLuint) -> Option<Vec<u8>> {
        self.emulation.lock().buffers.get(&name).map(|buffer| buffer.data.clone())
    }

    /// Width, height and tightly packed pixels of one texture level.
    #[must_use]
    pub fn texture_level(&self, name: GLuint, level: usize) -> Option<(u32, u32, Vec<u8>)> {
        let emulation = self.emulation.lock();
        let image = emulation.textures.get(&name)?.levels.get(level)?.as_ref()?;
        Some((image.width, image.height, image.data.clone()))
    }

    #[must_use]
    pub fn texture_level_count(&self, name: GLuint) -> usize {
        let emulation = self.emulation.lock();
        emulation
            .textures
            .get(&name)
            .map_or(0, |texture| texture.levels.iter().filter(|level| level.is_some()).count())
    }

    #[must_use]
    pub fn texture_parameter(&self, name: GLuint, pname: GLenum) -> Option<GLint> {
        self.emulation.lock().textures.get(&name)?.params.get(&pname).copied()
    }

    #[must_use]
    pub fn sampler_parameter(&self, name: GLuint, pname: GLenum) -> Option<GLint> {
        self.emulation.lock().samplers.get(&name)?.get(&pname).copied()
    }

    /// Sample count of a renderbuffer.
    #[must_use]
    pub fn renderbuffer_samples(&self, name: GLuint) -> Option<u32> {
        self.emulation.lock().renderbuffers.get(&name).map(|image| image.samples)
    }

    #[must_use]
    pub fn uniform_value(&self, program: GLuint, name: &str) -> Option<UniformValue> {
        let emulation = self.emulation.lock();
        let program = emulation.programs.get(&program)?;
        let location = program.locations.get(name)?;
        program.values.get(location).cloned()
    }

    #[must_use]
    pub fn uniform_block_binding(&self, program: GLuint, block: &str) -> Option<GLuint> {
        let emulation = self.emulation.lock();
        let program = emulation.programs.get(&program)?;
        let index = program.block_indices.get(block)?;
        program.block_bindings.get(index).copied()
    }

    #[must_use]
    pub fn attrib_location(&self, program: GLuint, name: &str) -> Option<u32> {
        self.emulation.lock().programs.get(&program)?.attrib_bindings.get(name).copied()
    }

    #[must_use]
    pub fn is_enabled(&self, cap: GLenum) -> bool {
        self.emulation.lock().enabled.contains(&cap)
    }

    #[must_use]
    pub fn current_program(&self) -> GLuint {
        self.emulation.lock().program
    }

    /// `(read, draw)` framebuffer bindings.
    #[must_use]
    pub fn bound_framebuffers(&self) -> (GLuint, GLuint) {
        let emulation = self.emulation.lock();
        (emulation.read_framebuffer, emulation.draw_framebuffer)
    }

    /// Pixels of the default framebuffer, if one was configured.
    #[must_use]
    pub fn default_framebuffer_pixels(&self) -> Option<Vec<u8>> {
        self.emulation.lock().default_surface.as_ref().map(|image| image.data.clone())
    }

    // ── Internals ────────────────────────────────────────────────────────────

    fn has_extension(&self, name: &str) -> bool {
        self.extensions.iter().any(|ext| ext == name)
    }

    /// Desktop entry point core since `major.minor`, or an ES3-class feature.
    fn core(&self, major: u32, minor: u32) -> bool {
        if self.version.is_gl() {
            self.version.at_least(major, minor)
        } else {
            self.version.is_es3_class()
        }
    }

    fn entry_point_available(&self, name: &str) -> bool {
        if self.removed_entry_points.contains(name) {
            return false;
        }
        let ext = |names: &[&str]| names.iter().any(|name| self.has_extension(name));
        match name {
            "glGenVertexArrays" | "glBindVertexArray" | "glDeleteVertexArrays" => {
                self.core(3, 0)
                    || ext(&["GL_OES_vertex_array_object", "GL_ARB_vertex_array_object", "GL_APPLE_vertex_array_object"])
            }
            "glMapBufferRange" | "glUnmapBuffer" => {
                !self.version.is_webgl() && (self.core(3, 0) || ext(&["GL_EXT_map_buffer_range"]))
            }
            "glBlitFramebuffer" => {
                self.core(3, 0)
                    || ext(&["GL_EXT_framebuffer_blit", "GL_ANGLE_framebuffer_blit", "GL_NV_framebuffer_blit"])
            }
            "glRenderbufferStorageMultisample" => {
                self.core(3, 0)
                    || ext(&[
                        "GL_EXT_framebuffer_multisample",
                        "GL_ANGLE_framebuffer_multisample",
                        "GL_NV_framebuffer_multisample",
                        "GL_APPLE_framebuffer_multisample",
                    ])
            }
            "glResolveMultisampleFramebufferAPPLE" => ext(&["GL_APPLE_framebuffer_multisample"]),
            "glFenceSync" | "glClientWaitSync" | "glWaitSync" | "glDeleteSync" => {
                self.core(3, 2) || ext(&["GL_ARB_sync", "GL_APPLE_sync"])
            }
            "glGenSamplers" | "glDeleteSamplers" | "glBindSampler" | "glSamplerParameteri" => self.core(3, 3),
            "glGetUniformBlockIndex" | "glUniformBlockBinding" | "glBindBufferRange" => self.core(3, 1),
            "glGetStringi" => self.core(3, 0),
            "glTextureBarrier" => {
                (self.version.is_gl() && self.version.at_least(4, 5))
                    || ext(&["GL_ARB_texture_barrier", "GL_NV_texture_barrier"])
            }
            _ => true,
        }
    }

    /// Counts a call; returns whether the entry point is resolved.
    fn enter(&self, name: &'static str) -> bool {
        *self.counters.lock().entry(name).or_insert(0) += 1;
        let available = self.entry_point_available(name);
        if !available {
            self.unresolved.fetch_add(1, Ordering::Relaxed);
        }
        available
    }

    fn generate(&self, name: &'static str, insert: impl FnOnce(&mut Emulation, GLuint)) -> GLuint {
        if !self.enter(name) || self.fail_allocations.load(Ordering::Relaxed) {
            return 0;
        }
        let mut emulation = self.emulation.lock();
        let id = emulation.gen_name();
        insert(&mut emulation, id);
        id
    }

    fn oom(&self, emulation: &mut Emulation) -> bool {
        if self.out_of_memory.load(Ordering::Relaxed) {
            emulation.set_error(GL_OUT_OF_MEMORY);
            return true;
        }
        false
    }

    fn set_uniform(&self, name: &'static str, location: GLint, value: UniformValue) {
        if !self.enter(name) || location < 0 {
            return;
        }
        let mut emulation = self.emulation.lock();
        match emulation.current_program_mut() {
            Some(program) => {
                program.values.insert(location, value);
            }
            None => emulation.set_error(GL_INVALID_OPERATION),
        }
    }
}

// ─── GlInterface ─────────────────────────────────────────────────────────────

impl GlInterface for HeadlessGl {
    fn get_error(&self) -> GLenum {
        if !self.enter("glGetError") {
            return GL_NO_ERROR;
        }
        std::mem::replace(&mut self.emulation.lock().error, GL_NO_ERROR)
    }

    fn get_string(&self, name: GLenum) -> Option<String> {
        if !self.enter("glGetString") {
            return None;
        }
        match name {
            GL_VERSION => Some(self.version_string.clone()),
            GL_VENDOR => Some(String::from("Vellum")),
            GL_RENDERER => Some(String::from("Headless")),
            GL_EXTENSIONS => Some(self.extensions.join(" ")),
            _ => None,
        }
    }

    fn get_string_i(&self, name: GLenum, index: u32) -> Option<String> {
        if !self.enter("glGetStringi") || name != GL_EXTENSIONS {
            return None;
        }
        self.extensions.get(index as usize).cloned()
    }

    fn get_integer(&self, pname: GLenum) -> GLint {
        if !self.enter("glGetIntegerv") {
            return 0;
        }
        match pname {
            GL_MAX_TEXTURE_SIZE => self.max_texture_size,
            GL_MAX_TEXTURE_IMAGE_UNITS => 16,
            GL_MAX_VERTEX_ATTRIBS => 16,
            GL_MAX_SAMPLES => self.max_samples,
            GL_NUM_EXTENSIONS => self.extensions.len() as GLint,
            _ => 0,
        }
    }

    fn is_entry_point_resolved(&self, name: &str) -> bool {
        self.entry_point_available(name)
    }

    fn flush(&self) {
        self.enter("glFlush");
    }

    fn finish(&self) {
        self.enter("glFinish");
    }

    // ── Buffers ──────────────────────────────────────────────────────────────

    fn create_buffer(&self) -> GLuint {
        self.generate("glGenBuffers", |emulation, id| {
            emulation.buffers.insert(id, BufferObject::default());
        })
    }

    fn delete_buffer(&self, buffer: GLuint) {
        if self.enter("glDeleteBuffers") {
            let mut emulation = self.emulation.lock();
            emulation.buffers.remove(&buffer);
            emulation.unbind_deleted(buffer);
        }
    }

    fn bind_buffer(&self, target: GLenum, buffer: GLuint) {
        if !self.enter("glBindBuffer") {
            return;
        }
        let mut emulation = self.emulation.lock();
        if buffer != 0 && !emulation.buffers.contains_key(&buffer) {
            emulation.set_error(GL_INVALID_OPERATION);
            return;
        }
        emulation.buffer_bindings.insert(target, buffer);
    }

    fn bind_buffer_range(&self, target: GLenum, _index: u32, buffer: GLuint, offset: usize, size: usize) {
        if !self.enter("glBindBufferRange") {
            return;
        }
        let mut emulation = self.emulation.lock();
        match emulation.buffers.get(&buffer) {
            Some(object) if offset + size <= object.data.len() => {
                emulation.buffer_bindings.insert(target, buffer);
            }
            _ => emulation.set_error(GL_INVALID_VALUE),
        }
    }

    fn buffer_data(&self, target: GLenum, size: usize, data: Option<&[u8]>, _usage: GLenum) {
        if !self.enter("glBufferData") {
            return;
        }
        let mut emulation = self.emulation.lock();
        if self.oom(&mut emulation) {
            return;
        }
        let bound = emulation.bound_buffer(target);
        match emulation.buffers.get_mut(&bound) {
            Some(object) => {
                object.data = vec![0; size];
                if let Some(data) = data {
                    let len = data.len().min(size);
                    object.data[..len].copy_from_slice(&data[..len]);
                }
                object.mapping = None;
            }
            None => emulation.set_error(GL_INVALID_OPERATION),
        }
    }

    fn buffer_sub_data(&self, target: GLenum, offset: usize, data: &[u8]) {
        if !self.enter("glBufferSubData") {
            return;
        }
        let mut emulation = self.emulation.lock();
        let bound = emulation.bound_buffer(target);
        match emulation.buffers.get_mut(&bound) {
            Some(object) if offset + data.len() <= object.data.len() && object.mapping.is_none() => {
                object.data[offset..offset + data.len()].copy_from_slice(data);
            }
            Some(_) => emulation.set_error(GL_INVALID_VALUE),
            None => emulation.set_error(GL_INVALID_OPERATION),
        }
    }

    fn map_buffer_range(&self, target: GLenum, offset: usize, length: usize, access: GLbitfield) -> *mut u8 {
        if !self.enter("glMapBufferRange") {
            return std::ptr::null_mut();
        }
        let mut emulation = self.emulation.lock();
        let bound = emulation.bound_buffer(target);
        let Some(object) = emulation.buffers.get_mut(&bound) else {
            emulation.set_error(GL_INVALID_OPERATION);
            return std::ptr::null_mut();
        };
        if object.mapping.is_some() || length == 0 || offset + length > object.data.len() {
            emulation.set_error(GL_INVALID_OPERATION);
            return std::ptr::null_mut();
        }
        // Ranges mapped without invalidation keep their contents.
        let staging = object.data[offset..offset + length].to_vec();
        let mapping = object.mapping.insert(Mapping {
            offset,
            access,
            staging,
        });
        mapping.staging.as_mut_ptr()
    }

    fn unmap_buffer(&self, target: GLenum) -> bool {
        if !self.enter("glUnmapBuffer") {
            return false;
        }
        let mut emulation = self.emulation.lock();
        let bound = emulation.bound_buffer(target);
        let Some(object) = emulation.buffers.get_mut(&bound) else {
            emulation.set_error(GL_INVALID_OPERATION);
            return false;
        };
        let Some(mapping) = object.mapping.take() else {
            emulation.set_error(GL_INVALID_OPERATION);
            return false;
        };
        if mapping.access & GL_MAP_WRITE_BIT != 0 {
            let end = mapping.offset + mapping.staging.len();
            object.data[mapping.offset..end].copy_from_slice(&mapping.staging);
        }
        true
    }

    // ── Textures ─────────────────────────────────────────────────────────────

    fn create_texture(&self) -> GLuint {
        self.generate("glGenTextures", |emulation, id| {
            emulation.textures.insert(id, TextureObject::default());
        })
    }

    fn delete_texture(&self, texture: GLuint) {
        if self.enter("glDeleteTextures") {
            let mut emulation = self.emulation.lock();
            emulation.textures.remove(&texture);
            emulation.unbind_deleted(texture);
        }
    }

    fn active_texture(&self, unit: GLenum) {
        if self.enter("glActiveTexture") {
            let mut emulation = self.emulation.lock();
            if unit < GL_TEXTURE0 {
                emulation.set_error(GL_INVALID_ENUM);
                return;
            }
            emulation.active_unit = unit - GL_TEXTURE0;
        }
    }

    fn bind_texture(&self, target: GLenum, texture: GLuint) {
        if !self.enter("glBindTexture") {
            return;
        }
        let mut emulation = self.emulation.lock();
        if texture != 0 {
            match emulation.textures.get_mut(&texture) {
                Some(object) if object.target == 0 || object.target == target => object.target = target,
                _ => {
                    emulation.set_error(GL_INVALID_OPERATION);
                    return;
                }
            }
        }
        let unit = emulation.active_unit;
        emulation.texture_bindings.insert((unit, target), texture);
    }

    fn tex_parameter_i(&self, target: GLenum, pname: GLenum, param: GLint) {
        if !self.enter("glTexParameteri") {
            return;
        }
        let mut emulation = self.emulation.lock();
        let bound = emulation.bound_texture(target);
        match emulation.textures.get_mut(&bound) {
            Some(object) => {
                object.params.insert(pname, param);
            }
            None => emulation.set_error(GL_INVALID_OPERATION),
        }
    }

    fn tex_image_2d(
        &self,
        target: GLenum,
        level: GLint,
        internal_format: GLint,
        width: GLint,
        height: GLint,
        format: GLenum,
        ty: GLenum,
        pixels: Option<&[u8]>,
    ) {
        if !self.enter("glTexImage2D") {
            return;
        }
        let mut emulation = self.emulation.lock();
        if self.oom(&mut emulation) {
            return;
        }
        let Some(bpp) = transfer_bpp(format, ty) else {
            emulation.set_error(GL_INVALID_ENUM);
            return;
        };
        if level < 0 || width < 0 || height < 0 || width > self.max_texture_size || height > self.max_texture_size {
            emulation.set_error(GL_INVALID_VALUE);
            return;
        }
        let row_length = emulation.row_length(GL_UNPACK_ROW_LENGTH, width);
        let bound = emulation.bound_texture(target);
        let Some(object) = emulation.textures.get_mut(&bound) else {
            emulation.set_error(GL_INVALID_OPERATION);
            return;
        };
        let mut image = Image::new(width as u32, height as u32, bpp, internal_format as GLenum, 1);
        if let Some(pixels) = pixels {
            Emulation::write_region(&mut image, 0, 0, width as usize, height as usize, row_length, pixels);
        }
        let level = level as usize;
        if object.levels.len() <= level {
            object.levels.resize(level + 1, None);
        }
        object.levels[level] = Some(image);
    }

    fn tex_sub_image_2d(
        &self,
        target: GLenum,
        level: GLint,
        x: GLint,
        y: GLint,
        width: GLint,
        height: GLint,
        format: GLenum,
        ty: GLenum,
        pixels: &[u8],
    ) {
        if !self.enter("glTexSubImage2D") {
            return;
        }
        let mut emulation = self.emulation.lock();
        let row_length = emulation.row_length(GL_UNPACK_ROW_LENGTH, width);
        let bound = emulation.bound_texture(target);
        let image = emulation
            .textures
            .get_mut(&bound)
            .and_then(|object| object.levels.get_mut(level.max(0) as usize))
            .and_then(Option::as_mut);
        let Some(image) = image else {
            emulation.set_error(GL_INVALID_OPERATION);
            return;
        };
        let in_bounds = x >= 0
            && y >= 0
            && i64::from(x) + i64::from(width) <= i64::from(image.width)
            && i64::from(y) + i64::from(height) <= i64::from(image.height);
        if transfer_bpp(format, ty) != Some(image.bpp) || !in_bounds {
            emulation.set_error(GL_INVALID_VALUE);
            return;
        }
        let (x, y) = (i64::from(x), i64::from(y));
        Emulation::write_region(image, x, y, width as usize, height as usize, row_length, pixels);
    }

    fn copy_tex_sub_image_2d(
        &self,
        target: GLenum,
        level: GLint,
        x_offset: GLint,
        y_offset: GLint,
        x: GLint,
        y: GLint,
        width: GLint,
        height: GLint,
    ) {
        if !self.enter("glCopyTexSubImage2D") {
            return;
        }
        let mut emulation = self.emulation.lock();
        let read = emulation.read_framebuffer;
        let Some(source) = emulation.color_image(read).filter(|image| image.samples <= 1) else {
            emulation.set_error(GL_INVALID_OPERATION);
            return;
        };
        let (width, height) = (width.max(0) as usize, height.max(0) as usize);
        let mut region = vec![0; width * height * source.bpp];
        Emulation::read_region(source, i64::from(x), i64::from(y), width, height, width, &mut region);

        let bound = emulation.bound_texture(target);
        let destination = emulation
            .textures
            .get_mut(&bound)
            .and_then(|object| object.levels.get_mut(level.max(0) as usize))
            .and_then(Option::as_mut);
        match destination {
            Some(image) => {
                let (x, y) = (i64::from(x_offset), i64::from(y_offset));
                Emulation::write_region(image, x, y, width, height, width, &region);
            }
            None => emulation.set_error(GL_INVALID_OPERATION),
        }
    }

    fn generate_mipmap(&self, target: GLenum) {
        if !self.enter("glGenerateMipmap") {
            return;
        }
        let mut emulation = self.emulation.lock();
        let bound = emulation.bound_texture(target);
        let Some(object) = emulation.textures.get_mut(&bound) else {
            emulation.set_error(GL_INVALID_OPERATION);
            return;
        };
        let Some(Some(base)) = object.levels.first().cloned() else {
            emulation.set_error(GL_INVALID_OPERATION);
            return;
        };
        let mut levels = vec![Some(base.clone())];
        let mut previous = base;
        while previous.width > 1 || previous.height > 1 {
            let (width, height) = ((previous.width / 2).max(1), (previous.height / 2).max(1));
            let mut next = Image::new(width, height, previous.bpp, previous.internal_format, 1);
            for y in 0..i64::from(height) {
                for x in 0..i64::from(width) {
                    let sx = (x * 2).min(i64::from(previous.width) - 1);
                    let sy = (y * 2).min(i64::from(previous.height) - 1);
                    let pixel = previous.pixel(sx, sy).to_vec();
                    next.set_pixel(x, y, &pixel);
                }
            }
            levels.push(Some(next.clone()));
            previous = next;
        }
        object.levels = levels;
    }

    fn pixel_store_i(&self, pname: GLenum, param: GLint) {
        if self.enter("glPixelStorei") {
            self.emulation.lock().pixel_store.insert(pname, param);
        }
    }

    fn texture_barrier(&self) {
        self.enter("glTextureBarrier");
    }

    // ── Samplers ─────────────────────────────────────────────────────────────

    fn create_sampler(&self) -> GLuint {
        self.generate("glGenSamplers", |emulation, id| {
            emulation.samplers.insert(id, FxHashMap::default());
        })
    }

    fn delete_sampler(&self, sampler: GLuint) {
        if self.enter("glDeleteSamplers") {
            let mut emulation = self.emulation.lock();
            emulation.samplers.remove(&sampler);
            emulation.sampler_bindings.retain(|_, bound| *bound != sampler);
        }
    }

    fn bind_sampler(&self, unit: u32, sampler: GLuint) {
        if self.enter("glBindSampler") {
            self.emulation.lock().sampler_bindings.insert(unit, sampler);
        }
    }

    fn sampler_parameter_i(&self, sampler: GLuint, pname: GLenum, param: GLint) {
        if !self.enter("glSamplerParameteri") {
            return;
        }
        let mut emulation = self.emulation.lock();
        match emulation.samplers.get_mut(&sampler) {
            Some(params) => {
                params.insert(pname, param);
            }
            None => emulation.set_error(GL_INVALID_OPERATION),
        }
    }

    // ── Framebuffers & Renderbuffers ─────────────────────────────────────────

    fn create_framebuffer(&self) -> GLuint {
        self.generate("glGenFramebuffers", |emulation, id| {
            emulation.framebuffers.insert(id, Framebuffer::default());
        })
    }

    fn delete_framebuffer(&self, framebuffer: GLuint) {
        if self.enter("glDeleteFramebuffers") {
            let mut emulation = self.emulation.lock();
            emulation.framebuffers.remove(&framebuffer);
            if emulation.read_framebuffer == framebuffer {
                emulation.read_framebuffer = 0;
            }
            if emulation.draw_framebuffer == framebuffer {
                emulation.draw_framebuffer = 0;
            }
        }
    }

    fn bind_framebuffer(&self, target: GLenum, framebuffer: GLuint) {
        if !self.enter("glBindFramebuffer") {
            return;
        }
        let mut emulation = self.emulation.lock();
        if framebuffer != 0 && !emulation.framebuffers.contains_key(&framebuffer) {
            emulation.set_error(GL_INVALID_OPERATION);
            return;
        }
        match target {
            GL_READ_FRAMEBUFFER => emulation.read_framebuffer = framebuffer,
            GL_DRAW_FRAMEBUFFER => emulation.draw_framebuffer = framebuffer,
            _ => {
                emulation.read_framebuffer = framebuffer;
                emulation.draw_framebuffer = framebuffer;
            }
        }
    }

    fn framebuffer_texture_2d(&self, target: GLenum, attachment: GLenum, _tex_target: GLenum, texture: GLuint, level: GLint) {
        if !self.enter("glFramebufferTexture2D") {
            return;
        }
        let mut emulation = self.emulation.lock();
        let bound = emulation.bound_framebuffer(target);
        let value = (texture != 0).then_some(Attachment::Texture {
            name: texture,
            level: level.max(0) as usize,
        });
        match emulation.framebuffers.get_mut(&bound) {
            Some(framebuffer) => match attachment {
                GL_COLOR_ATTACHMENT0 => framebuffer.color = value,
                GL_DEPTH_STENCIL_ATTACHMENT | GL_DEPTH_ATTACHMENT | GL_STENCIL_ATTACHMENT => {
                    framebuffer.depth_stencil = value;
                }
                _ => emulation.set_error(GL_INVALID_ENUM),
            },
            None => emulation.set_error(GL_INVALID_OPERATION),
        }
    }

    fn framebuffer_renderbuffer(&self, target: GLenum, attachment: GLenum, _rb_target: GLenum, renderbuffer: GLuint) {
        if !self.enter("glFramebufferRenderbuffer") {
            return;
        }
        let mut emulation = self.emulation.lock();
        let bound = emulation.bound_framebuffer(target);
        let value = (renderbuffer != 0).then_some(Attachment::Renderbuffer(renderbuffer));
        match emulation.framebuffers.get_mut(&bound) {
            Some(framebuffer) => match attachment {
                GL_COLOR_ATTACHMENT0 => framebuffer.color = value,
                GL_DEPTH_STENCIL_ATTACHMENT | GL_DEPTH_ATTACHMENT | GL_STENCIL_ATTACHMENT => {
                    framebuffer.depth_stencil = value;
                }
                _ => emulation.set_error(GL_INVALID_ENUM),
            },
            None => emulation.set_error(GL_INVALID_OPERATION),
        }
    }

    fn check_framebuffer_status(&self, target: GLenum) -> GLenum {
        if !self.enter("glCheckFramebufferStatus") {
            return 0;
        }
        let emulation = self.emulation.lock();
        let bound = emulation.bound_framebuffer(target);
        if bound == 0 {
            return GL_FRAMEBUFFER_COMPLETE;
        }
        if self.incomplete_framebuffers.load(Ordering::Relaxed) {
            return GL_FRAMEBUFFER_UNSUPPORTED;
        }
        let Some(framebuffer) = emulation.framebuffers.get(&bound) else {
            return GL_FRAMEBUFFER_UNSUPPORTED;
        };
        if framebuffer.color.is_none() && framebuffer.depth_stencil.is_none() {
            return GL_FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT;
        }
        let color = framebuffer.color.map(|attachment| emulation.attachment_image(attachment));
        let depth_stencil = framebuffer.depth_stencil.map(|attachment| emulation.attachment_image(attachment));
        match (color, depth_stencil) {
            (Some(None), _) | (_, Some(None)) => GL_FRAMEBUFFER_INCOMPLETE_ATTACHMENT,
            (Some(Some(color)), _) if !is_color_renderable(color.internal_format) => {
                GL_FRAMEBUFFER_INCOMPLETE_ATTACHMENT
            }
            (Some(Some(color)), Some(Some(depth)))
                if (color.width, color.height) != (depth.width, depth.height) =>
            {
                GL_FRAMEBUFFER_INCOMPLETE_ATTACHMENT
            }
            _ => GL_FRAMEBUFFER_COMPLETE,
        }
    }

    fn blit_framebuffer(&self, src: [GLint; 4], dst: [GLint; 4], mask: GLbitfield, _filter: GLenum) {
        if !self.enter("glBlitFramebuffer") {
            return;
        }
        if mask & GL_COLOR_BUFFER_BIT == 0 {
            return;
        }
        let mut emulation = self.emulation.lock();
        let (read, draw) = (emulation.read_framebuffer, emulation.draw_framebuffer);
        let Some(source) = emulation.color_image(read).cloned() else {
            emulation.set_error(GL_INVALID_OPERATION);
            return;
        };
        let Some(destination) = emulation.color_image_mut(draw).filter(|image| image.samples <= 1) else {
            emulation.set_error(GL_INVALID_OPERATION);
            return;
        };
        if source.bpp != destination.bpp {
            emulation.set_error(GL_INVALID_OPERATION);
            return;
        }
        let (src_w, src_h) = (i64::from(src[2] - src[0]), i64::from(src[3] - src[1]));
        let (dst_w, dst_h) = (i64::from(dst[2] - dst[0]), i64::from(dst[3] - dst[1]));
        if src_w <= 0 || src_h <= 0 || dst_w <= 0 || dst_h <= 0 {
            return;
        }
        for dy in 0..dst_h {
            for dx in 0..dst_w {
                let sx = i64::from(src[0]) + dx * src_w / dst_w;
                let sy = i64::from(src[1]) + dy * src_h / dst_h;
                let (tx, ty) = (i64::from(dst[0]) + dx, i64::from(dst[1]) + dy);
                if source.contains(sx, sy) && destination.contains(tx, ty) {
                    destination.set_pixel(tx, ty, source.pixel(sx, sy));
                }
            }
        }
    }

    fn resolve_multisample_framebuffer(&self) {
        if !self.enter("glResolveMultisampleFramebufferAPPLE") {
            return;
        }
        let mut emulation = self.emulation.lock();
        let (read, draw) = (emulation.read_framebuffer, emulation.draw_framebuffer);
        let Some(source) = emulation.color_image(read).cloned() else {
            emulation.set_error(GL_INVALID_OPERATION);
            return;
        };
        match emulation.color_image_mut(draw) {
            Some(destination) if destination.bpp == source.bpp => {
                for y in 0..i64::from(source.height.min(destination.height)) {
                    for x in 0..i64::from(source.width.min(destination.width)) {
                        destination.set_pixel(x, y, source.pixel(x, y));
                    }
                }
            }
            _ => emulation.set_error(GL_INVALID_OPERATION),
        }
    }

    fn read_pixels(&self, x: GLint, y: GLint, width: GLint, height: GLint, format: GLenum, ty: GLenum, pixels: &mut [u8]) {
        if !self.enter("glReadPixels") {
            return;
        }
        let mut emulation = self.emulation.lock();
        let row_length = emulation.row_length(GL_PACK_ROW_LENGTH, width);
        let read = emulation.read_framebuffer;
        let Some(source) = emulation.color_image(read).filter(|image| image.samples <= 1) else {
            emulation.set_error(GL_INVALID_OPERATION);
            return;
        };
        if transfer_bpp(format, ty) != Some(source.bpp) {
            emulation.set_error(GL_INVALID_OPERATION);
            return;
        }
        let (width, height) = (width.max(0) as usize, height.max(0) as usize);
        Emulation::read_region(source, i64::from(x), i64::from(y), width, height, row_length, pixels);
    }

    fn read_pixels_to_pack_buffer(
        &self,
        x: GLint,
        y: GLint,
        width: GLint,
        height: GLint,
        format: GLenum,
        ty: GLenum,
        offset: usize,
    ) {
        if !self.enter("glReadPixels") {
            return;
        }
        let mut emulation = self.emulation.lock();
        let row_length = emulation.row_length(GL_PACK_ROW_LENGTH, width);
        let read = emulation.read_framebuffer;
        let Some(source) = emulation.color_image(read).filter(|image| image.samples <= 1).cloned() else {
            emulation.set_error(GL_INVALID_OPERATION);
            return;
        };
        if transfer_bpp(format, ty) != Some(source.bpp) {
            emulation.set_error(GL_INVALID_OPERATION);
            return;
        }
        let (width, height) = (width.max(0) as usize, height.max(0) as usize);
        let needed = if width == 0 || height == 0 { 0 } else { ((height - 1) * row_length + width) * source.bpp };
        let pack = emulation.bound_buffer(GL_PIXEL_PACK_BUFFER);
        match emulation.buffers.get_mut(&pack) {
            Some(buffer) if offset + needed <= buffer.data.len() => {
                let destination = &mut buffer.data[offset..];
                Emulation::read_region(&source, i64::from(x), i64::from(y), width, height, row_length, destination);
            }
            _ => emulation.set_error(GL_INVALID_OPERATION),
        }
    }

    fn create_renderbuffer(&self) -> GLuint {
        self.generate("glGenRenderbuffers", |emulation, id| {
            emulation.renderbuffers.insert(id, Image::new(0, 0, 0, 0, 1));
        })
    }

    fn delete_renderbuffer(&self, renderbuffer: GLuint) {
        if self.enter("glDeleteRenderbuffers") {
            let mut emulation = self.emulation.lock();
            emulation.renderbuffers.remove(&renderbuffer);
            if emulation.renderbuffer == renderbuffer {
                emulation.renderbuffer = 0;
            }
        }
    }

    fn bind_renderbuffer(&self, _target: GLenum, renderbuffer: GLuint) {
        if !self.enter("glBindRenderbuffer") {
            return;
        }
        let mut emulation = self.emulation.lock();
        if renderbuffer != 0 && !emulation.renderbuffers.contains_key(&renderbuffer) {
            emulation.set_error(GL_INVALID_OPERATION);
            return;
        }
        emulation.renderbuffer = renderbuffer;
    }

    fn renderbuffer_storage(&self, _target: GLenum, internal_format: GLenum, width: GLint, height: GLint) {
        if !self.enter("glRenderbufferStorage") {
            return;
        }
        let mut emulation = self.emulation.lock();
        if self.oom(&mut emulation) {
            return;
        }
        let Some(bpp) = renderbuffer_bpp(internal_format) else {
            emulation.set_error(GL_INVALID_ENUM);
            return;
        };
        let bound = emulation.renderbuffer;
        match emulation.renderbuffers.get_mut(&bound) {
            Some(image) => *image = Image::new(width.max(0) as u32, height.max(0) as u32, bpp, internal_format, 1),
            None => emulation.set_error(GL_INVALID_OPERATION),
        }
    }

    fn renderbuffer_storage_multisample(
        &self,
        _target: GLenum,
        samples: GLint,
        internal_format: GLenum,
        width: GLint,
        height: GLint,
    ) {
        if !self.enter("glRenderbufferStorageMultisample") {
            return;
        }
        let mut emulation = self.emulation.lock();
        if self.oom(&mut emulation) {
            return;
        }
        if samples > self.max_samples {
            emulation.set_error(GL_INVALID_VALUE);
            return;
        }
        let Some(bpp) = renderbuffer_bpp(internal_format) else {
            emulation.set_error(GL_INVALID_ENUM);
            return;
        };
        let bound = emulation.renderbuffer;
        let samples = samples.max(1) as u32;
        match emulation.renderbuffers.get_mut(&bound) {
            Some(image) => {
                *image = Image::new(width.max(0) as u32, height.max(0) as u32, bpp, internal_format, samples);
            }
            None => emulation.set_error(GL_INVALID_OPERATION),
        }
    }

    // ── Shaders & Programs ───────────────────────────────────────────────────

    fn create_shader(&self, ty: GLenum) -> GLuint {
        self.generate("glCreateShader", |emulation, id| {
            emulation.shaders.insert(
                id,
                ShaderObject {
                    ty,
                    source: String::new(),
                    compiled: false,
                    log: String::new(),
                },
            );
        })
    }

    fn shader_source(&self, shader: GLuint, source: &str) {
        if !self.enter("glShaderSource") {
            return;
        }
        let mut emulation = self.emulation.lock();
        match emulation.shaders.get_mut(&shader) {
            Some(object) => object.source = source.to_owned(),
            None => emulation.set_error(GL_INVALID_VALUE),
        }
    }

    fn compile_shader(&self, shader: GLuint) {
        if !self.enter("glCompileShader") {
            return;
        }
        let mut emulation = self.emulation.lock();
        let Some(object) = emulation.shaders.get_mut(&shader) else {
            emulation.set_error(GL_INVALID_VALUE);
            return;
        };
        if object.source.trim().is_empty() {
            object.compiled = false;
            object.log = String::from("ERROR: 0:1: '' : syntax error: empty source");
        } else if let Some(position) = object.source.find("#error") {
            let message = object.source[position + "#error".len()..].lines().next().unwrap_or_default().trim();
            object.compiled = false;
            object.log = format!("ERROR: 0:1: '#error' : {message}");
        } else {
            object.compiled = true;
            object.log.clear();
        }
    }

    fn get_shader_parameter(&self, shader: GLuint, pname: GLenum) -> GLint {
        if !self.enter("glGetShaderiv") {
            return 0;
        }
        let emulation = self.emulation.lock();
        let Some(object) = emulation.shaders.get(&shader) else {
            return 0;
        };
        match pname {
            GL_COMPILE_STATUS => GLint::from(object.compiled),
            GL_INFO_LOG_LENGTH if object.log.is_empty() => 0,
            GL_INFO_LOG_LENGTH => object.log.len() as GLint + 1,
            _ => 0,
        }
    }

    fn get_shader_info_log(&self, shader: GLuint) -> String {
        if !self.enter("glGetShaderInfoLog") {
            return String::new();
        }
        self.emulation.lock().shaders.get(&shader).map(|object| object.log.clone()).unwrap_or_default()
    }

    fn delete_shader(&self, shader: GLuint) {
        if self.enter("glDeleteShader") {
            self.emulation.lock().shaders.remove(&shader);
        }
    }

    fn create_program(&self) -> GLuint {
        self.generate("glCreateProgram", |emulation, id| {
            emulation.programs.insert(id, ProgramObject::default());
        })
    }

    fn attach_shader(&self, program: GLuint, shader: GLuint) {
        if !self.enter("glAttachShader") {
            return;
        }
        let mut emulation = self.emulation.lock();
        if !emulation.shaders.contains_key(&shader) {
            emulation.set_error(GL_INVALID_VALUE);
            return;
        }
        match emulation.programs.get_mut(&program) {
            Some(object) => object.shaders.push(shader),
            None => emulation.set_error(GL_INVALID_VALUE),
        }
    }

    fn detach_shader(&self, program: GLuint, shader: GLuint) {
        if self.enter("glDetachShader") {
            if let Some(object) = self.emulation.lock().programs.get_mut(&program) {
                object.shaders.retain(|&attached| attached != shader);
            }
        }
    }

    fn bind_attrib_location(&self, program: GLuint, index: u32, name: &str) {
        if self.enter("glBindAttribLocation") {
            if let Some(object) = self.emulation.lock().programs.get_mut(&program) {
                object.attrib_bindings.insert(name.to_owned(), index);
            }
        }
    }

    fn link_program(&self, program: GLuint) {
        if !self.enter("glLinkProgram") {
            return;
        }
        let mut emulation = self.emulation.lock();
        let Some(object) = emulation.programs.get(&program) else {
            emulation.set_error(GL_INVALID_VALUE);
            return;
        };
        let attached: Vec<&ShaderObject> = object.shaders.iter().filter_map(|id| emulation.shaders.get(id)).collect();
        let has_vertex = attached.iter().any(|shader| shader.ty == GL_VERTEX_SHADER);
        let has_fragment = attached.iter().any(|shader| shader.ty != GL_VERTEX_SHADER);
        let all_compiled = attached.iter().all(|shader| shader.compiled);
        let sources: Vec<String> = attached.iter().map(|shader| shader.source.clone()).collect();

        let (linked, log) = if !all_compiled {
            (false, String::from("error: attached shader is not compiled"))
        } else if !has_vertex || !has_fragment {
            (false, String::from("error: program requires a vertex and a fragment shader"))
        } else {
            (true, String::new())
        };

        if let Some(object) = emulation.programs.get_mut(&program) {
            object.linked = linked;
            object.log = log;
            object.sources = sources;
            object.locations.clear();
            object.block_indices.clear();
            object.values.clear();
        }
    }

    fn get_program_parameter(&self, program: GLuint, pname: GLenum) -> GLint {
        if !self.enter("glGetProgramiv") {
            return 0;
        }
        let emulation = self.emulation.lock();
        let Some(object) = emulation.programs.get(&program) else {
            return 0;
        };
        match pname {
            GL_LINK_STATUS => GLint::from(object.linked),
            GL_INFO_LOG_LENGTH if object.log.is_empty() => 0,
            GL_INFO_LOG_LENGTH => object.log.len() as GLint + 1,
            _ => 0,
        }
    }

    fn get_program_info_log(&self, program: GLuint) -> String {
        if !self.enter("glGetProgramInfoLog") {
            return String::new();
        }
        self.emulation.lock().programs.get(&program).map(|object| object.log.clone()).unwrap_or_default()
    }

    fn delete_program(&self, program: GLuint) {
        if self.enter("glDeleteProgram") {
            let mut emulation = self.emulation.lock();
            emulation.programs.remove(&program);
            if emulation.program == program {
                emulation.program = 0;
            }
        }
    }

    fn use_program(&self, program: GLuint) {
        if !self.enter("glUseProgram") {
            return;
        }
        let mut emulation = self.emulation.lock();
        if program != 0 && !emulation.programs.get(&program).is_some_and(|object| object.linked) {
            emulation.set_error(GL_INVALID_OPERATION);
            return;
        }
        emulation.program = program;
    }

    fn get_uniform_location(&self, program: GLuint, name: &str) -> GLint {
        if !self.enter("glGetUniformLocation") {
            return -1;
        }
        let mut emulation = self.emulation.lock();
        match emulation.programs.get_mut(&program) {
            Some(object) if object.linked => {
                if !object.mentions(name) {
                    return -1;
                }
                let next = object.locations.len() as GLint;
                *object.locations.entry(name.to_owned()).or_insert(next)
            }
            _ => {
                emulation.set_error(GL_INVALID_OPERATION);
                -1
            }
        }
    }

    fn get_uniform_block_index(&self, program: GLuint, name: &str) -> GLuint {
        if !self.enter("glGetUniformBlockIndex") {
            return GL_INVALID_INDEX;
        }
        let mut emulation = self.emulation.lock();
        match emulation.programs.get_mut(&program) {
            Some(object) if object.linked => {
                if !object.mentions(name) {
                    return GL_INVALID_INDEX;
                }
                let next = object.block_indices.len() as GLuint;
                *object.block_indices.entry(name.to_owned()).or_insert(next)
            }
            _ => {
                emulation.set_error(GL_INVALID_OPERATION);
                GL_INVALID_INDEX
            }
        }
    }

    fn uniform_block_binding(&self, program: GLuint, index: GLuint, binding: GLuint) {
        if !self.enter("glUniformBlockBinding") {
            return;
        }
        let mut emulation = self.emulation.lock();
        match emulation.programs.get_mut(&program) {
            Some(object) if (index as usize) < object.block_indices.len() => {
                object.block_bindings.insert(index, binding);
            }
            _ => emulation.set_error(GL_INVALID_VALUE),
        }
    }

    fn uniform_1i(&self, location: GLint, value: GLint) {
        self.set_uniform("glUniform1i", location, UniformValue::Int(vec![value]));
    }

    fn uniform_1fv(&self, location: GLint, values: &[f32]) {
        self.set_uniform("glUniform1fv", location, UniformValue::Float(values.to_vec()));
    }

    fn uniform_2fv(&self, location: GLint, values: &[f32]) {
        self.set_uniform("glUniform2fv", location, UniformValue::Float(values.to_vec()));
    }

    fn uniform_3fv(&self, location: GLint, values: &[f32]) {
        self.set_uniform("glUniform3fv", location, UniformValue::Float(values.to_vec()));
    }

    fn uniform_4fv(&self, location: GLint, values: &[f32]) {
        self.set_uniform("glUniform4fv", location, UniformValue::Float(values.to_vec()));
    }

    fn uniform_1iv(&self, location: GLint, values: &[i32]) {
        self.set_uniform("glUniform1iv", location, UniformValue::Int(values.to_vec()));
    }

    fn uniform_2iv(&self, location: GLint, values: &[i32]) {
        self.set_uniform("glUniform2iv", location, UniformValue::Int(values.to_vec()));
    }

    fn uniform_3iv(&self, location: GLint, values: &[i32]) {
        self.set_uniform("glUniform3iv", location, UniformValue::Int(values.to_vec()));
    }

    fn uniform_4iv(&self, location: GLint, values: &[i32]) {
        self.set_uniform("glUniform4iv", location, UniformValue::Int(values.to_vec()));
    }

    fn uniform_matrix_2fv(&self, location: GLint, values: &[f32]) {
        self.set_uniform("glUniformMatrix2fv", location, UniformValue::Float(values.to_vec()));
    }

    fn uniform_matrix_3fv(&self, location: GLint, values: &[f32]) {
        self.set_uniform("glUniformMatrix3fv", location, UniformValue::Float(values.to_vec()));
    }

    fn uniform_matrix_4fv(&self, location: GLint, values: &[f32]) {
        self.set_uniform("glUniformMatrix4fv", location, UniformValue::Float(values.to_vec()));
    }

    // ── Vertex Input ─────────────────────────────────────────────────────────

    fn create_vertex_array(&self) -> GLuint {
        self.generate("glGenVertexArrays", |emulation, id| {
            emulation.vertex_arrays.insert(id);
        })
    }

    fn delete_vertex_array(&self, vertex_array: GLuint) {
        if self.enter("glDeleteVertexArrays") {
            let mut emulation = self.emulation.lock();
            emulation.vertex_arrays.remove(&vertex_array);
            if emulation.vertex_array == vertex_array {
                emulation.vertex_array = 0;
            }
        }
    }

    fn bind_vertex_array(&self, vertex_array: GLuint) {
        if !self.enter("glBindVertexArray") {
            return;
        }
        let mut emulation = self.emulation.lock();
        if vertex_array != 0 && !emulation.vertex_arrays.contains(&vertex_array) {
            emulation.set_error(GL_INVALID_OPERATION);
            return;
        }
        emulation.vertex_array = vertex_array;
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        if self.enter("glEnableVertexAttribArray") {
            self.emulation.lock().enabled_attributes.insert(index);
        }
    }

    fn disable_vertex_attrib_array(&self, index: u32) {
        if self.enter("glDisableVertexAttribArray") {
            self.emulation.lock().enabled_attributes.remove(&index);
        }
    }

    fn vertex_attrib_pointer(&self, _index: u32, size: GLint, _ty: GLenum, _normalized: bool, stride: GLint, _offset: usize) {
        if !self.enter("glVertexAttribPointer") {
            return;
        }
        let mut emulation = self.emulation.lock();
        if !(1..=4).contains(&size) || stride < 0 || emulation.bound_buffer(GL_ARRAY_BUFFER) == 0 {
            emulation.set_error(GL_INVALID_OPERATION);
        }
    }

    // ── Fixed-Function State ─────────────────────────────────────────────────

    fn enable(&self, cap: GLenum) {
        if self.enter("glEnable") {
            self.emulation.lock().enabled.insert(cap);
        }
    }

    fn disable(&self, cap: GLenum) {
        if self.enter("glDisable") {
            self.emulation.lock().enabled.remove(&cap);
        }
    }

    fn blend_func_separate(&self, _src_rgb: GLenum, _dst_rgb: GLenum, _src_alpha: GLenum, _dst_alpha: GLenum) {
        self.enter("glBlendFuncSeparate");
    }

    fn blend_equation_separate(&self, _mode_rgb: GLenum, _mode_alpha: GLenum) {
        self.enter("glBlendEquationSeparate");
    }

    fn color_mask(&self, _red: bool, _green: bool, _blue: bool, _alpha: bool) {
        self.enter("glColorMask");
    }

    fn depth_mask(&self, _flag: bool) {
        self.enter("glDepthMask");
    }

    fn depth_func(&self, _func: GLenum) {
        self.enter("glDepthFunc");
    }

    fn stencil_func_separate(&self, _face: GLenum, _func: GLenum, _reference: GLint, _mask: GLuint) {
        self.enter("glStencilFuncSeparate");
    }

    fn stencil_op_separate(&self, _face: GLenum, _stencil_fail: GLenum, _depth_fail: GLenum, _depth_pass: GLenum) {
        self.enter("glStencilOpSeparate");
    }

    fn stencil_mask_separate(&self, _face: GLenum, _mask: GLuint) {
        self.enter("glStencilMaskSeparate");
    }

    fn viewport(&self, x: GLint, y: GLint, width: GLint, height: GLint) {
        if self.enter("glViewport") {
            self.emulation.lock().viewport = [x, y, width, height];
        }
    }

    fn scissor(&self, x: GLint, y: GLint, width: GLint, height: GLint) {
        if self.enter("glScissor") {
            self.emulation.lock().scissor = [x, y, width, height];
        }
    }

    fn clear_color(&self, red: f32, green: f32, blue: f32, alpha: f32) {
        if self.enter("glClearColor") {
            self.emulation.lock().clear_color = [red, green, blue, alpha];
        }
    }

    fn clear_depth(&self, _depth: f32) {
        self.enter("glClearDepthf");
    }

    fn clear_stencil(&self, stencil: GLint) {
        if self.enter("glClearStencil") {
            self.emulation.lock().clear_stencil = stencil;
        }
    }

    fn clear(&self, mask: GLbitfield) {
        if !self.enter("glClear") {
            return;
        }
        let mut emulation = self.emulation.lock();
        let scissor = emulation.enabled.contains(&GL_SCISSOR_TEST).then_some(emulation.scissor);
        let inside = |x: i64, y: i64| {
            scissor.is_none_or(|[sx, sy, sw, sh]| {
                x >= i64::from(sx) && y >= i64::from(sy) && x < i64::from(sx) + i64::from(sw) && y < i64::from(sy) + i64::from(sh)
            })
        };
        let draw = emulation.draw_framebuffer;

        if mask & GL_COLOR_BUFFER_BIT != 0 {
            let color = emulation.clear_color;
            if let Some(image) = emulation.color_image_mut(draw) {
                let pixel = encode_clear_color(image.internal_format, image.bpp, color);
                for y in 0..i64::from(image.height) {
                    for x in 0..i64::from(image.width) {
                        if inside(x, y) {
                            image.set_pixel(x, y, &pixel);
                        }
                    }
                }
            }
        }

        if mask & (GL_STENCIL_BUFFER_BIT | GL_DEPTH_BUFFER_BIT) != 0 {
            let stencil = emulation.clear_stencil as u8;
            let attachment = emulation.framebuffers.get(&draw).and_then(|framebuffer| framebuffer.depth_stencil);
            if let Some(image) = attachment.and_then(|attachment| emulation.attachment_image_mut(attachment)) {
                if image.bpp == 4 && mask & GL_STENCIL_BUFFER_BIT != 0 {
                    for y in 0..i64::from(image.height) {
                        for x in 0..i64::from(image.width) {
                            if inside(x, y) {
                                let mut pixel = image.pixel(x, y).to_vec();
                                pixel[3] = stencil;
                                image.set_pixel(x, y, &pixel);
                            }
                        }
                    }
                }
            }
        }
    }

    // ── Draws ────────────────────────────────────────────────────────────────

    fn draw_arrays(&self, _mode: GLenum, first: GLint, count: GLint) {
        if !self.enter("glDrawArrays") {
            return;
        }
        let mut emulation = self.emulation.lock();
        if first < 0 || count < 0 {
            emulation.set_error(GL_INVALID_VALUE);
        } else if emulation.current_program_mut().is_none() {
            emulation.set_error(GL_INVALID_OPERATION);
        }
    }

    fn draw_elements(&self, _mode: GLenum, count: GLint, _ty: GLenum, _offset: usize) {
        if !self.enter("glDrawElements") {
            return;
        }
        let mut emulation = self.emulation.lock();
        if count < 0 {
            emulation.set_error(GL_INVALID_VALUE);
        } else if emulation.current_program_mut().is_none() || emulation.bound_buffer(GL_ELEMENT_ARRAY_BUFFER) == 0 {
            emulation.set_error(GL_INVALID_OPERATION);
        }
    }

    // ── Sync ─────────────────────────────────────────────────────────────────

    fn fence_sync(&self, _condition: GLenum, _flags: GLbitfield) -> Option<GlSync> {
        if !self.enter("glFenceSync") || self.fail_allocations.load(Ordering::Relaxed) {
            return None;
        }
        let mut emulation = self.emulation.lock();
        let handle = emulation.next_sync;
        emulation.next_sync += 0x10;
        emulation.syncs.insert(handle);
        GlSync::from_raw(handle as *const std::ffi::c_void)
    }

    fn client_wait_sync(&self, sync: GlSync, _flags: GLbitfield, _timeout: GLuint64) -> GLenum {
        if !self.enter("glClientWaitSync") {
            return GL_WAIT_FAILED;
        }
        if self.emulation.lock().syncs.contains(&(sync.as_raw() as usize)) {
            GL_ALREADY_SIGNALED
        } else {
            GL_WAIT_FAILED
        }
    }

    fn wait_sync(&self, sync: GlSync, _flags: GLbitfield, _timeout: GLuint64) {
        if !self.enter("glWaitSync") {
            return;
        }
        let mut emulation = self.emulation.lock();
        if !emulation.syncs.contains(&(sync.as_raw() as usize)) {
            emulation.set_error(GL_INVALID_VALUE);
        }
    }

    fn delete_sync(&self, sync: GlSync) {
        if self.enter("glDeleteSync") {
            self.emulation.lock().syncs.remove(&(sync.as_raw() as usize));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::consts::{GL_FRAMEBUFFER, GL_RGBA8, GL_TEXTURE_2D};

    #[test]
    fn unresolved_calls_are_counted_and_ignored() {
        let gl = HeadlessGl::gles(2);
        assert!(!gl.is_entry_point_resolved("glGenVertexArrays"));
        assert_eq!(gl.create_vertex_array(), 0);
        assert_eq!(gl.unresolved_calls(), 1);
        assert_eq!(gl.call_count("glGenVertexArrays"), 1);
    }

    #[test]
    fn extensions_resolve_their_entry_points() {
        let gl = HeadlessGl::gles(2).with_extension("GL_OES_vertex_array_object");
        assert!(gl.is_entry_point_resolved("glBindVertexArray"));
        assert!(!HeadlessGl::webgl(2).is_entry_point_resolved("glMapBufferRange"));
    }

    #[test]
    fn removed_entry_points_stay_unresolved() {
        let gl = HeadlessGl::gles(3).without_entry_point("glBlitFramebuffer");
        assert!(!gl.is_entry_point_resolved("glBlitFramebuffer"));
        assert!(gl.is_entry_point_resolved("glRenderbufferStorageMultisample"));
    }

    #[test]
    fn clear_then_read_back_through_a_framebuffer() {
        let gl = HeadlessGl::gles(3);
        let texture = gl.create_texture();
        gl.bind_texture(GL_TEXTURE_2D, texture);
        gl.tex_image_2d(GL_TEXTURE_2D, 0, GL_RGBA8 as GLint, 2, 2, GL_RGBA, GL_UNSIGNED_BYTE, None);
        let framebuffer = gl.create_framebuffer();
        gl.bind_framebuffer(GL_FRAMEBUFFER, framebuffer);
        gl.framebuffer_texture_2d(GL_FRAMEBUFFER, GL_COLOR_ATTACHMENT0, GL_TEXTURE_2D, texture, 0);
        assert_eq!(gl.check_framebuffer_status(GL_FRAMEBUFFER), GL_FRAMEBUFFER_COMPLETE);

        gl.clear_color(1.0, 0.0, 0.0, 1.0);
        gl.clear(GL_COLOR_BUFFER_BIT);
        let mut pixels = [0u8; 16];
        gl.read_pixels(0, 0, 2, 2, GL_RGBA, GL_UNSIGNED_BYTE, &mut pixels);
        assert_eq!(&pixels[..4], &[255, 0, 0, 255]);
        assert_eq!(gl.get_error(), GL_NO_ERROR);
    }

    #[test]
    fn luminance_attachments_are_incomplete() {
        let gl = HeadlessGl::gles(2);
        let texture = gl.create_texture();
        gl.bind_texture(GL_TEXTURE_2D, texture);
        gl.tex_image_2d(GL_TEXTURE_2D, 0, GL_LUMINANCE as GLint, 4, 4, GL_LUMINANCE, GL_UNSIGNED_BYTE, None);
        let framebuffer = gl.create_framebuffer();
        gl.bind_framebuffer(GL_FRAMEBUFFER, framebuffer);
        gl.framebuffer_texture_2d(GL_FRAMEBUFFER, GL_COLOR_ATTACHMENT0, GL_TEXTURE_2D, texture, 0);
        assert_eq!(gl.check_framebuffer_status(GL_FRAMEBUFFER), GL_FRAMEBUFFER_INCOMPLETE_ATTACHMENT);
    }

    #[test]
    fn mapped_writes_commit_on_unmap() {
        let gl = HeadlessGl::gles(3);
        let buffer = gl.create_buffer();
        gl.bind_buffer(GL_ARRAY_BUFFER, buffer);
        gl.buffer_data(GL_ARRAY_BUFFER, 8, None, 0);
        let ptr = gl.map_buffer_range(GL_ARRAY_BUFFER, 4, 4, GL_MAP_WRITE_BIT);
        assert!(!ptr.is_null());
        unsafe { std::ptr::copy_nonoverlapping([1u8, 2, 3, 4].as_ptr(), ptr, 4) };
        assert!(gl.unmap_buffer(GL_ARRAY_BUFFER));
        assert_eq!(gl.buffer_contents(buffer).unwrap(), vec![0, 0, 0, 0, 1, 2, 3, 4]);
    }

    #[test]
    fn half_float_encoding_of_common_values() {
        assert_eq!(f32_to_f16_bits(0.0), 0);
        assert_eq!(f32_to_f16_bits(1.0), 0x3C00);
        assert_eq!(f32_to_f16_bits(0.5), 0x3800);
        assert_eq!(f32_to_f16_bits(-2.0), 0xC000);
    }
}
