//! Mirror of the mutable driver state.
//!
//! Every setter compares the requested value with the cached one and only issues the
//! native call on a change. Bindings are compared by resource identity (a `u64` that
//! is never reused), not by native name, so a deleted-then-regenerated name can never
//! be mistaken for the object that previously held it.
//!
//! A `None` slot means "unknown": the next setter always reaches the driver. Foreign
//! code that touches the context must be followed by [`StateCache::reset`].

use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::{SmallVec, smallvec};

use super::consts::{
    GLenum, GLint, GLuint, GL_ARRAY_BUFFER, GL_BACK, GL_DRAW_FRAMEBUFFER, GL_ELEMENT_ARRAY_BUFFER, GL_FRAMEBUFFER,
    GL_FRONT, GL_FRONT_AND_BACK, GL_PIXEL_PACK_BUFFER, GL_PIXEL_UNPACK_BUFFER, GL_READ_FRAMEBUFFER, GL_TEXTURE0,
    GL_UNIFORM_BUFFER,
};
use super::interface::GlInterface;

const BUFFER_TARGETS: [GLenum; 5] = [
    GL_ARRAY_BUFFER,
    GL_ELEMENT_ARRAY_BUFFER,
    GL_UNIFORM_BUFFER,
    GL_PIXEL_PACK_BUFFER,
    GL_PIXEL_UNPACK_BUFFER,
];

fn buffer_slot(target: GLenum) -> Option<usize> {
    BUFFER_TARGETS.iter().position(|&t| t == target)
}

/// Index of a stencil face in the per-face caches.
fn face_slots(face: GLenum) -> &'static [usize] {
    match face {
        GL_FRONT => &[0],
        GL_BACK => &[1],
        _ => &[0, 1],
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct StencilFunc {
    func: GLenum,
    reference: GLint,
    mask: GLuint,
}

pub struct StateCache {
    gl: Arc<dyn GlInterface>,

    current_program: Option<u64>,
    active_texture_unit: Option<u32>,
    /// `(identity, target)` per unit
    texture_units: SmallVec<[Option<(u64, GLenum)>; 16]>,
    sampler_units: SmallVec<[Option<u64>; 16]>,
    read_framebuffer: Option<u64>,
    draw_framebuffer: Option<u64>,
    buffers: [Option<u64>; BUFFER_TARGETS.len()],
    vertex_array: Option<GLuint>,
    /// Bitmask of enabled attribute arrays; `None` when unknown.
    enabled_attributes: Option<u32>,

    capabilities: FxHashMap<GLenum, bool>,
    blend_func: Option<[GLenum; 4]>,
    blend_equation: Option<[GLenum; 2]>,
    color_mask: Option<[bool; 4]>,
    depth_mask: Option<bool>,
    depth_func: Option<GLenum>,
    stencil_func: [Option<StencilFunc>; 2],
    stencil_op: [Option<[GLenum; 3]>; 2],
    stencil_mask: [Option<GLuint>; 2],
    viewport: Option<[GLint; 4]>,
    scissor: Option<[GLint; 4]>,
    clear_color: Option<[u32; 4]>,
    clear_depth: Option<u32>,
    clear_stencil: Option<GLint>,
    pixel_store: FxHashMap<GLenum, GLint>,
}

impl std::fmt::Debug for StateCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateCache")
            .field("current_program", &self.current_program)
            .field("active_texture_unit", &self.active_texture_unit)
            .field("read_framebuffer", &self.read_framebuffer)
            .field("draw_framebuffer", &self.draw_framebuffer)
            .finish_non_exhaustive()
    }
}

impl StateCache {
    /// Creates a cache tracking `texture_units` units. Every slot starts unknown.
    pub fn new(gl: Arc<dyn GlInterface>, texture_units: usize) -> Self {
        Self {
            gl,
            current_program: None,
            active_texture_unit: None,
            texture_units: smallvec![None; texture_units],
            sampler_units: smallvec![None; texture_units],
            read_framebuffer: None,
            draw_framebuffer: None,
            buffers: [None; BUFFER_TARGETS.len()],
            vertex_array: None,
            enabled_attributes: None,
            capabilities: FxHashMap::default(),
            blend_func: None,
            blend_equation: None,
            color_mask: None,
            depth_mask: None,
            depth_func: None,
            stencil_func: [None; 2],
            stencil_op: [None; 2],
            stencil_mask: [None; 2],
            viewport: None,
            scissor: None,
            clear_color: None,
            clear_depth: None,
            clear_stencil: None,
            pixel_store: FxHashMap::default(),
        }
    }

    #[inline]
    pub fn gl(&self) -> &dyn GlInterface {
        self.gl.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn texture_unit_count(&self) -> usize {
        self.texture_units.len()
    }

    /// Forgets every cached value.
    pub fn reset(&mut self) {
        self.current_program = None;
        self.active_texture_unit = None;
        self.texture_units.fill(None);
        self.sampler_units.fill(None);
        self.read_framebuffer = None;
        self.draw_framebuffer = None;
        self.buffers = [None; BUFFER_TARGETS.len()];
        self.vertex_array = None;
        self.enabled_attributes = None;
        self.capabilities.clear();
        self.blend_func = None;
        self.blend_equation = None;
        self.color_mask = None;
        self.depth_mask = None;
        self.depth_func = None;
        self.stencil_func = [None; 2];
        self.stencil_op = [None; 2];
        self.stencil_mask = [None; 2];
        self.viewport = None;
        self.scissor = None;
        self.clear_color = None;
        self.clear_depth = None;
        self.clear_stencil = None;
        self.pixel_store.clear();
    }

    /// Drops every binding that refers to `identity`. Called when the object is
    /// released so the slot is re-bound on next use.
    pub fn forget(&mut self, identity: u64) {
        if self.current_program == Some(identity) {
            self.current_program = None;
        }
        for slot in &mut self.texture_units {
            if matches!(slot, Some((id, _)) if *id == identity) {
                *slot = None;
            }
        }
        for slot in self.sampler_units.iter_mut().chain(self.buffers.iter_mut()) {
            if *slot == Some(identity) {
                *slot = None;
            }
        }
        if self.read_framebuffer == Some(identity) {
            self.read_framebuffer = None;
        }
        if self.draw_framebuffer == Some(identity) {
            self.draw_framebuffer = None;
        }
    }

    // ── Bindings ─────────────────────────────────────────────────────────────

    pub fn use_program(&mut self, identity: u64, program: GLuint) {
        if self.current_program != Some(identity) {
            self.gl.use_program(program);
            self.current_program = Some(identity);
        }
    }

    pub fn active_texture(&mut self, unit: u32) {
        if self.active_texture_unit != Some(unit) {
            self.gl.active_texture(GL_TEXTURE0 + unit);
            self.active_texture_unit = Some(unit);
        }
    }

    /// Binds a texture to `unit`, activating the unit only when the binding changes.
    pub fn bind_texture(&mut self, unit: u32, target: GLenum, identity: u64, texture: GLuint) {
        let slot = unit as usize;
        if self.texture_units.get(slot).copied().flatten() == Some((identity, target)) {
            return;
        }
        self.active_texture(unit);
        self.gl.bind_texture(target, texture);
        if let Some(cached) = self.texture_units.get_mut(slot) {
            *cached = Some((identity, target));
        }
    }

    /// Marks `unit` as holding an unknown texture. Used after a temporary bind made
    /// outside the cache.
    pub fn invalidate_texture_unit(&mut self, unit: u32) {
        if let Some(cached) = self.texture_units.get_mut(unit as usize) {
            *cached = None;
        }
    }

    pub fn bind_sampler(&mut self, unit: u32, identity: u64, sampler: GLuint) {
        let slot = unit as usize;
        if self.sampler_units.get(slot).copied().flatten() == Some(identity) {
            return;
        }
        self.gl.bind_sampler(unit, sampler);
        if let Some(cached) = self.sampler_units.get_mut(slot) {
            *cached = Some(identity);
        }
    }

    /// `GL_FRAMEBUFFER` binds both the read and draw targets.
    pub fn bind_framebuffer(&mut self, target: GLenum, identity: u64, framebuffer: GLuint) {
        let (read, draw) = match target {
            GL_READ_FRAMEBUFFER => (true, false),
            GL_DRAW_FRAMEBUFFER => (false, true),
            _ => (true, true),
        };
        let read_current = !read || self.read_framebuffer == Some(identity);
        let draw_current = !draw || self.draw_framebuffer == Some(identity);
        if read_current && draw_current {
            return;
        }
        let target = if read && draw { GL_FRAMEBUFFER } else { target };
        self.gl.bind_framebuffer(target, framebuffer);
        if read {
            self.read_framebuffer = Some(identity);
        }
        if draw {
            self.draw_framebuffer = Some(identity);
        }
    }

    pub fn bind_buffer(&mut self, target: GLenum, identity: u64, buffer: GLuint) {
        match buffer_slot(target) {
            Some(slot) => {
                if self.buffers[slot] != Some(identity) {
                    self.gl.bind_buffer(target, buffer);
                    self.buffers[slot] = Some(identity);
                }
            }
            None => self.gl.bind_buffer(target, buffer),
        }
    }

    /// Binds an indexed range. Also replaces the generic binding of `target`.
    pub fn bind_buffer_range(
        &mut self,
        target: GLenum,
        index: u32,
        identity: u64,
        buffer: GLuint,
        offset: usize,
        size: usize,
    ) {
        self.gl.bind_buffer_range(target, index, buffer, offset, size);
        if let Some(slot) = buffer_slot(target) {
            self.buffers[slot] = Some(identity);
        }
    }

    /// Unbinds `target` (binds name 0), e.g. to leave pixel transfers reading client memory.
    pub fn unbind_buffer(&mut self, target: GLenum) {
        self.bind_buffer(target, 0, 0);
    }

    pub fn bind_vertex_array(&mut self, vertex_array: GLuint) {
        if self.vertex_array != Some(vertex_array) {
            self.gl.bind_vertex_array(vertex_array);
            self.vertex_array = Some(vertex_array);
        }
    }

    /// Enables exactly the attribute arrays in `mask`.
    pub fn set_enabled_attributes(&mut self, mask: u32) {
        let (to_enable, to_disable) = match self.enabled_attributes {
            Some(current) => (mask & !current, current & !mask),
            // Unknown state: touch every location the new mask names, disable nothing.
            None => (mask, 0),
        };
        for location in 0..u32::BITS {
            let bit = 1 << location;
            if to_enable & bit != 0 {
                self.gl.enable_vertex_attrib_array(location);
            } else if to_disable & bit != 0 {
                self.gl.disable_vertex_attrib_array(location);
            }
        }
        self.enabled_attributes = Some(mask);
    }

    // ── Fixed-Function State ─────────────────────────────────────────────────

    pub fn set_capability(&mut self, cap: GLenum, enabled: bool) {
        if self.capabilities.get(&cap) == Some(&enabled) {
            return;
        }
        if enabled {
            self.gl.enable(cap);
        } else {
            self.gl.disable(cap);
        }
        self.capabilities.insert(cap, enabled);
    }

    pub fn blend_func_separate(&mut self, src_rgb: GLenum, dst_rgb: GLenum, src_alpha: GLenum, dst_alpha: GLenum) {
        let value = [src_rgb, dst_rgb, src_alpha, dst_alpha];
        if self.blend_func != Some(value) {
            self.gl.blend_func_separate(src_rgb, dst_rgb, src_alpha, dst_alpha);
            self.blend_func = Some(value);
        }
    }

    pub fn blend_equation_separate(&mut self, mode_rgb: GLenum, mode_alpha: GLenum) {
        let value = [mode_rgb, mode_alpha];
        if self.blend_equation != Some(value) {
            self.gl.blend_equation_separate(mode_rgb, mode_alpha);
            self.blend_equation = Some(value);
        }
    }

    pub fn color_mask(&mut self, red: bool, green: bool, blue: bool, alpha: bool) {
        let value = [red, green, blue, alpha];
        if self.color_mask != Some(value) {
            self.gl.color_mask(red, green, blue, alpha);
            self.color_mask = Some(value);
        }
    }

    pub fn depth_mask(&mut self, flag: bool) {
        if self.depth_mask != Some(flag) {
            self.gl.depth_mask(flag);
            self.depth_mask = Some(flag);
        }
    }

    pub fn depth_func(&mut self, func: GLenum) {
        if self.depth_func != Some(func) {
            self.gl.depth_func(func);
            self.depth_func = Some(func);
        }
    }

    pub fn stencil_func_separate(&mut self, face: GLenum, func: GLenum, reference: GLint, mask: GLuint) {
        let value = StencilFunc { func, reference, mask };
        let slots = face_slots(face);
        if slots.iter().all(|&slot| self.stencil_func[slot] == Some(value)) {
            return;
        }
        self.gl.stencil_func_separate(face, func, reference, mask);
        for &slot in slots {
            self.stencil_func[slot] = Some(value);
        }
    }

    pub fn stencil_op_separate(&mut self, face: GLenum, stencil_fail: GLenum, depth_fail: GLenum, depth_pass: GLenum) {
        let value = [stencil_fail, depth_fail, depth_pass];
        let slots = face_slots(face);
        if slots.iter().all(|&slot| self.stencil_op[slot] == Some(value)) {
            return;
        }
        self.gl.stencil_op_separate(face, stencil_fail, depth_fail, depth_pass);
        for &slot in slots {
            self.stencil_op[slot] = Some(value);
        }
    }

    pub fn stencil_mask_separate(&mut self, face: GLenum, mask: GLuint) {
        let slots = face_slots(face);
        if slots.iter().all(|&slot| self.stencil_mask[slot] == Some(mask)) {
            return;
        }
        self.gl.stencil_mask_separate(face, mask);
        for &slot in slots {
            self.stencil_mask[slot] = Some(mask);
        }
    }

    /// Stencil writes for both faces. Clears honor the write mask.
    pub fn stencil_mask(&mut self, mask: GLuint) {
        self.stencil_mask_separate(GL_FRONT_AND_BACK, mask);
    }

    pub fn viewport(&mut self, x: GLint, y: GLint, width: GLint, height: GLint) {
        let value = [x, y, width, height];
        if self.viewport != Some(value) {
            self.gl.viewport(x, y, width, height);
            self.viewport = Some(value);
        }
    }

    pub fn scissor(&mut self, x: GLint, y: GLint, width: GLint, height: GLint) {
        let value = [x, y, width, height];
        if self.scissor != Some(value) {
            self.gl.scissor(x, y, width, height);
            self.scissor = Some(value);
        }
    }

    pub fn clear_color(&mut self, red: f32, green: f32, blue: f32, alpha: f32) {
        // Bit patterns, so NaN compares equal to itself.
        let value = [red.to_bits(), green.to_bits(), blue.to_bits(), alpha.to_bits()];
        if self.clear_color != Some(value) {
            self.gl.clear_color(red, green, blue, alpha);
            self.clear_color = Some(value);
        }
    }

    pub fn clear_depth(&mut self, depth: f32) {
        if self.clear_depth != Some(depth.to_bits()) {
            self.gl.clear_depth(depth);
            self.clear_depth = Some(depth.to_bits());
        }
    }

    pub fn clear_stencil(&mut self, stencil: GLint) {
        if self.clear_stencil != Some(stencil) {
            self.gl.clear_stencil(stencil);
            self.clear_stencil = Some(stencil);
        }
    }

    pub fn pixel_store_i(&mut self, pname: GLenum, param: GLint) {
        if self.pixel_store.get(&pname) != Some(&param) {
            self.gl.pixel_store_i(pname, param);
            self.pixel_store.insert(pname, param);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::consts::{GL_BLEND, GL_TEXTURE_2D, GL_UNPACK_ROW_LENGTH};
    use crate::gl::headless::HeadlessGl;

    fn cache() -> (Arc<HeadlessGl>, StateCache) {
        let gl = Arc::new(HeadlessGl::gles(3));
        let state = StateCache::new(gl.clone(), 8);
        (gl, state)
    }

    #[test]
    fn same_texture_identity_binds_once() {
        let (gl, mut state) = cache();
        state.bind_texture(0, GL_TEXTURE_2D, 7, 1);
        state.bind_texture(0, GL_TEXTURE_2D, 7, 1);
        assert_eq!(gl.call_count("glBindTexture"), 1);
        assert_eq!(gl.call_count("glActiveTexture"), 1);

        state.bind_texture(0, GL_TEXTURE_2D, 8, 2);
        assert_eq!(gl.call_count("glBindTexture"), 2);
        assert_eq!(gl.call_count("glActiveTexture"), 1);
    }

    #[test]
    fn units_are_tracked_independently() {
        let (gl, mut state) = cache();
        state.bind_texture(0, GL_TEXTURE_2D, 7, 1);
        state.bind_texture(1, GL_TEXTURE_2D, 7, 1);
        state.bind_texture(0, GL_TEXTURE_2D, 7, 1);
        assert_eq!(gl.call_count("glBindTexture"), 2);
        assert_eq!(gl.call_count("glActiveTexture"), 2);
    }

    #[test]
    fn forget_forces_a_rebind() {
        let (gl, mut state) = cache();
        state.bind_texture(0, GL_TEXTURE_2D, 7, 1);
        state.forget(7);
        state.bind_texture(0, GL_TEXTURE_2D, 7, 1);
        assert_eq!(gl.call_count("glBindTexture"), 2);
    }

    #[test]
    fn reset_forgets_everything() {
        let (gl, mut state) = cache();
        state.set_capability(GL_BLEND, true);
        state.viewport(0, 0, 16, 16);
        state.reset();
        state.set_capability(GL_BLEND, true);
        state.viewport(0, 0, 16, 16);
        assert_eq!(gl.call_count("glEnable"), 2);
        assert_eq!(gl.call_count("glViewport"), 2);
    }

    #[test]
    fn framebuffer_target_covers_read_and_draw() {
        let (gl, mut state) = cache();
        state.bind_framebuffer(GL_FRAMEBUFFER, 3, 1);
        state.bind_framebuffer(GL_READ_FRAMEBUFFER, 3, 1);
        state.bind_framebuffer(GL_DRAW_FRAMEBUFFER, 3, 1);
        assert_eq!(gl.call_count("glBindFramebuffer"), 1);

        state.bind_framebuffer(GL_READ_FRAMEBUFFER, 4, 2);
        state.bind_framebuffer(GL_FRAMEBUFFER, 3, 1);
        assert_eq!(gl.call_count("glBindFramebuffer"), 3);
    }

    #[test]
    fn attribute_mask_only_touches_changed_locations() {
        let (gl, mut state) = cache();
        state.set_enabled_attributes(0b011);
        assert_eq!(gl.call_count("glEnableVertexAttribArray"), 2);
        state.set_enabled_attributes(0b110);
        assert_eq!(gl.call_count("glEnableVertexAttribArray"), 3);
        assert_eq!(gl.call_count("glDisableVertexAttribArray"), 1);
        state.set_enabled_attributes(0b110);
        assert_eq!(gl.call_count("glEnableVertexAttribArray"), 3);
    }

    #[test]
    fn stencil_face_caches_merge_for_front_and_back() {
        let (gl, mut state) = cache();
        state.stencil_mask_separate(GL_FRONT, 0xFF);
        state.stencil_mask_separate(GL_BACK, 0xFF);
        state.stencil_mask(0xFF);
        assert_eq!(gl.call_count("glStencilMaskSeparate"), 2);
    }

    #[test]
    fn pixel_store_is_deduplicated() {
        let (gl, mut state) = cache();
        state.pixel_store_i(GL_UNPACK_ROW_LENGTH, 0);
        state.pixel_store_i(GL_UNPACK_ROW_LENGTH, 0);
        state.pixel_store_i(GL_UNPACK_ROW_LENGTH, 64);
        assert_eq!(gl.call_count("glPixelStorei"), 2);
    }
}
