use bevy::input::mouse::{MouseMotion, MouseScrollUnit, MouseWheel};
use bevy::prelude::*;
use bevy::window::RequestRedraw;

const ORBIT_SPEED: f32 = 0.005;
const PAN_SPEED: f32 = 0.002;
const MIN_DISTANCE: f32 = 5.0;
const MAX_DISTANCE: f32 = 5000.0;

#[derive(Component)]
pub struct EditorCamera;

/// Point the editor camera orbits around
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct OrbitTarget(pub Vec3);

/// Camera pose saved across a history restore
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    pub transform: Transform,
    pub target: Vec3,
}

/// Set when the scene changed outside the usual update flow
#[derive(Resource, Default, Debug)]
pub struct RedrawRequest {
    pending: bool,
}

impl RedrawRequest {
    pub fn request(&mut self) {
        self.pending = true;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    fn take(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }
}

pub fn spawn_camera(mut commands: Commands) {
    commands.spawn((
        Camera3d::default(),
        EditorCamera,
        OrbitTarget(Vec3::ZERO),
        Transform::from_xyz(120.0, 140.0, 120.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}

pub fn capture_view(world: &mut World) -> Option<CameraView> {
    let mut cameras = world.query_filtered::<(&Transform, &OrbitTarget), With<EditorCamera>>();
    cameras.iter(world).next().map(|(transform, target)| CameraView {
        transform: *transform,
        target: target.0,
    })
}

pub fn restore_view(world: &mut World, view: CameraView) {
    let mut cameras =
        world.query_filtered::<(&mut Transform, &mut OrbitTarget), With<EditorCamera>>();
    for (mut transform, mut target) in cameras.iter_mut(world) {
        *transform = view.transform;
        target.0 = view.target;
    }
}

pub fn camera_orbit(
    mouse_button: Res<ButtonInput<MouseButton>>,
    mut mouse_motion: MessageReader<MouseMotion>,
    mut camera_query: Query<(&mut Transform, &OrbitTarget), With<EditorCamera>>,
) {
    if !mouse_button.pressed(MouseButton::Right) {
        mouse_motion.clear();
        return;
    }

    let Ok((mut transform, target)) = camera_query.single_mut() else {
        return;
    };

    for event in mouse_motion.read() {
        let offset = transform.translation - target.0;
        let yaw = Quat::from_rotation_y(-event.delta.x * ORBIT_SPEED);
        let pitch = Quat::from_axis_angle(*transform.right(), -event.delta.y * ORBIT_SPEED);
        let rotated = yaw * pitch * offset;
        // Keep away from the poles so look_at stays stable
        if rotated.normalize_or_zero().dot(Vec3::Y).abs() < 0.99 {
            transform.translation = target.0 + rotated;
        } else {
            transform.translation = target.0 + yaw * offset;
        }
        transform.look_at(target.0, Vec3::Y);
    }
}

pub fn camera_pan(
    mouse_button: Res<ButtonInput<MouseButton>>,
    mut mouse_motion: MessageReader<MouseMotion>,
    mut camera_query: Query<(&mut Transform, &mut OrbitTarget), With<EditorCamera>>,
) {
    if !mouse_button.pressed(MouseButton::Middle) {
        mouse_motion.clear();
        return;
    }

    let Ok((mut transform, mut target)) = camera_query.single_mut() else {
        return;
    };

    for event in mouse_motion.read() {
        let distance = transform.translation.distance(target.0);
        let shift = (*transform.right() * -event.delta.x + *transform.up() * event.delta.y)
            * distance
            * PAN_SPEED;
        transform.translation += shift;
        target.0 += shift;
    }
}

pub fn camera_zoom(
    mut scroll_events: MessageReader<MouseWheel>,
    mut camera_query: Query<(&mut Transform, &OrbitTarget), With<EditorCamera>>,
) {
    let Ok((mut transform, target)) = camera_query.single_mut() else {
        return;
    };

    for event in scroll_events.read() {
        let scroll_amount = match event.unit {
            MouseScrollUnit::Line => event.y * 0.1,
            MouseScrollUnit::Pixel => event.y * 0.001,
        };

        let offset = transform.translation - target.0;
        let distance = (offset.length() * (1.0 - scroll_amount)).clamp(MIN_DISTANCE, MAX_DISTANCE);
        transform.translation = target.0 + offset.normalize_or_zero() * distance;
    }
}

/// Forward a pending redraw request to the window loop
pub fn request_redraw(mut redraw: ResMut<RedrawRequest>, mut writer: MessageWriter<RequestRedraw>) {
    if redraw.take() {
        writer.write(RequestRedraw);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_survives_capture_and_restore() {
        let mut world = World::new();
        let start = Transform::from_xyz(10.0, 20.0, 30.0).looking_at(Vec3::ZERO, Vec3::Y);
        world.spawn((EditorCamera, OrbitTarget(Vec3::ZERO), start));

        let view = capture_view(&mut world).unwrap();

        let mut cameras = world.query_filtered::<&mut Transform, With<EditorCamera>>();
        for mut transform in cameras.iter_mut(&mut world) {
            transform.translation = Vec3::splat(99.0);
        }

        restore_view(&mut world, view);
        let mut cameras = world.query_filtered::<(&Transform, &OrbitTarget), With<EditorCamera>>();
        let (transform, target) = cameras.single(&world).unwrap();
        assert_eq!(*transform, start);
        assert_eq!(target.0, Vec3::ZERO);
    }

    #[test]
    fn test_redraw_request_is_taken_once() {
        let mut redraw = RedrawRequest::default();
        redraw.request();
        assert!(redraw.is_pending());
        assert!(redraw.take());
        assert!(!redraw.take());
    }
}
