use glam::{Mat4, Vec3};

/// `|sin(y)|` above this counts as gimbal lock during Euler extraction.
const GIMBAL_THRESHOLD: f32 = 0.999_999_9;

/// Transform 组件
///
/// 位置、欧拉角旋转（XYZ，弧度）、缩放，以及矩阵缓存和脏检查逻辑。
///
/// 局部矩阵固定为 `T(position) × Rx × Ry × Rz × S(scale)`。
#[derive(Debug, Clone)]
pub struct Transform {
    // === Public 属性 ===
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,

    // === 矩阵缓存 ===
    pub(crate) local_matrix: Mat4,
    pub(crate) world_matrix: Mat4,

    // === 脏检查状态 ===
    last_position: Vec3,
    last_rotation: Vec3,
    last_scale: Vec3,
    force_update: bool,
}

impl Transform {
    #[must_use]
    pub fn new() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,

            local_matrix: Mat4::IDENTITY,
            world_matrix: Mat4::IDENTITY,

            last_position: Vec3::ZERO,
            last_rotation: Vec3::ZERO,
            last_scale: Vec3::ONE,
            force_update: true,
        }
    }

    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::new()
        }
    }

    // ========================================================================
    // 核心逻辑：智能更新 (Shadow State Check)
    // ========================================================================

    /// 检查并更新局部矩阵
    /// 返回值: bool (是否发生了变化)
    pub fn update_local_matrix(&mut self) -> bool {
        let changed = self.position != self.last_position
            || self.rotation != self.last_rotation
            || self.scale != self.last_scale
            || self.force_update;

        if changed {
            self.local_matrix = compose(self.position, self.rotation, self.scale);

            self.last_position = self.position;
            self.last_rotation = self.rotation;
            self.last_scale = self.scale;
            self.force_update = false;
        }

        changed
    }

    // ========================================================================
    // Getters & Helpers
    // ========================================================================

    pub fn set_rotation_euler(&mut self, x: f32, y: f32, z: f32) {
        self.rotation = Vec3::new(x, y, z);
    }

    #[inline]
    #[must_use]
    pub fn local_matrix(&self) -> &Mat4 {
        &self.local_matrix
    }

    #[inline]
    #[must_use]
    pub fn world_matrix(&self) -> &Mat4 {
        &self.world_matrix
    }

    /// 世界空间位置
    #[inline]
    #[must_use]
    pub fn world_position(&self) -> Vec3 {
        self.world_matrix.w_axis.truncate()
    }

    /// 供变换系统更新完矩阵后写入
    pub fn set_world_matrix(&mut self, mat: Mat4) {
        self.world_matrix = mat;
    }

    /// LookAt 变换
    ///
    /// Orients the transform so that its -Z axis points at `target`
    /// (`target` and `up` are in the parent's space). The rotation is written
    /// back as XYZ Euler angles and the transform is marked dirty, so the
    /// next hierarchy or view update recomposes local and world matrices.
    ///
    /// A target at the current position leaves the rotation untouched; an
    /// `up` parallel to the view direction is swapped for another axis.
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        let forward = target - self.position;
        if forward.length_squared() < f32::EPSILON {
            return;
        }
        let up = stable_up(forward, up);

        let rotation = Mat4::look_at_rh(self.position, target, up).inverse();
        let euler = euler_xyz_from_matrix(&rotation);
        if !euler.is_finite() {
            log::warn!("look_at produced a non-finite rotation, keeping the previous one");
            return;
        }

        self.rotation = euler;
        self.local_matrix = compose(self.position, self.rotation, self.scale);
        self.mark_dirty();
    }

    /// 手动标记脏（例如用于强制刷新）
    pub fn mark_dirty(&mut self) {
        self.force_update = true;
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

/// `T × Rx × Ry × Rz × S`
#[must_use]
pub fn compose(position: Vec3, rotation: Vec3, scale: Vec3) -> Mat4 {
    Mat4::from_translation(position)
        * Mat4::from_rotation_x(rotation.x)
        * Mat4::from_rotation_y(rotation.y)
        * Mat4::from_rotation_z(rotation.z)
        * Mat4::from_scale(scale)
}

/// Extracts XYZ Euler angles from the rotation part of `mat`.
///
/// `m` below is the matrix in row-major order.
#[must_use]
pub fn euler_xyz_from_matrix(mat: &Mat4) -> Vec3 {
    let m = mat.transpose().to_cols_array();

    let y = m[2].clamp(-1.0, 1.0).asin();
    if m[2].abs() < GIMBAL_THRESHOLD {
        let x = (-m[6]).atan2(m[10]);
        let z = (-m[1]).atan2(m[0]);
        Vec3::new(x, y, z)
    } else {
        // gimbal lock: X and Z share an axis, fold everything into X
        let x = m[9].atan2(m[5]);
        Vec3::new(x, y, 0.0)
    }
}

fn stable_up(forward: Vec3, up: Vec3) -> Vec3 {
    let dir = forward.normalize();
    if up.length_squared() > f32::EPSILON && dir.cross(up.normalize()).length_squared() > 1e-6 {
        return up;
    }
    // forward ∥ up
    if dir.cross(Vec3::Z).length_squared() > 1e-6 {
        Vec3::Z
    } else {
        Vec3::X
    }
}
