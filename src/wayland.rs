// Wayland integration module
// Window, keyboard and shared-memory presentation using smithay-client-toolkit

use crate::config::WindowConfig;
use crate::error::PlatformError;
use crate::image_loader;
use crate::input::{Event, Key};
use crate::platform::Platform;
use crate::surface::{blit_scaled, PixelFormat, Rect, Surface};
use anyhow::{anyhow, Context, Result};
use log::{debug, error, info, warn};
use smithay_client_toolkit::{
    compositor::{CompositorHandler, CompositorState},
    delegate_compositor, delegate_keyboard, delegate_output, delegate_registry, delegate_seat,
    delegate_shm, delegate_xdg_shell, delegate_xdg_window,
    output::{OutputHandler, OutputState},
    registry::{ProvidesRegistryState, RegistryState},
    registry_handlers,
    seat::{
        keyboard::{KeyEvent, KeyboardHandler, Keysym, Modifiers},
        Capability, SeatHandler, SeatState,
    },
    shell::{
        xdg::{
            window::{Window, WindowConfigure, WindowDecorations, WindowHandler},
            XdgShell,
        },
        WaylandSurface,
    },
    shm::{
        slot::{Buffer, SlotPool},
        Shm, ShmHandler,
    },
};
use wayland_client::{
    globals::registry_queue_init,
    protocol::{wl_keyboard, wl_output, wl_seat, wl_shm, wl_surface},
    Connection, EventQueue, QueueHandle,
};

/// Arrow keysyms and the keys they stand for
const ARROW_KEYS: [(Keysym, Key); 4] = [
    (Keysym::Up, Key::Up),
    (Keysym::Down, Key::Down),
    (Keysym::Left, Key::Left),
    (Keysym::Right, Key::Right),
];

/// Display formats in order of preference
const FORMAT_PREFERENCE: [PixelFormat; 2] = [PixelFormat::Xrgb8888, PixelFormat::Argb8888];

fn to_wl_shm(format: PixelFormat) -> wl_shm::Format {
    match format {
        PixelFormat::Xrgb8888 => wl_shm::Format::Xrgb8888,
        PixelFormat::Argb8888 => wl_shm::Format::Argb8888,
    }
}

/// Pick the window surface format from those the compositor offers
///
/// Both candidates are mandatory in wl_shm, so an empty list still yields XRGB.
fn choose_format(offered: &[wl_shm::Format]) -> PixelFormat {
    FORMAT_PREFERENCE
        .into_iter()
        .find(|&format| offered.contains(&to_wl_shm(format)))
        .unwrap_or(PixelFormat::Xrgb8888)
}

/// Translate an xkb keysym into a platform-neutral key
fn key_from_keysym(keysym: Keysym) -> Key {
    if let Some(&(_, key)) = ARROW_KEYS.iter().find(|(sym, _)| *sym == keysym) {
        return key;
    }
    match keysym.key_char() {
        Some(c) if !c.is_control() => Key::Char(c.to_ascii_lowercase()),
        _ => Key::Other,
    }
}

/// Allocate one window-sized buffer from the pool
fn create_frame_buffer(
    pool: &mut SlotPool,
    width: u32,
    height: u32,
    format: wl_shm::Format,
) -> Result<Buffer> {
    let stride = width as i32 * PixelFormat::BYTES_PER_PIXEL as i32;
    let (buffer, _) = pool
        .create_buffer(width as i32, height as i32, stride, format)
        .map_err(|e| anyhow!("Failed to create buffer {}x{}: {}", width, height, e))?;
    Ok(buffer)
}

/// Dispatch target for every Wayland event
struct WaylandState {
    registry_state: RegistryState,
    seat_state: SeatState,
    output_state: OutputState,
    shm: Shm,
    // Globals stay bound for as long as the window exists
    _compositor: CompositorState,
    _xdg_shell: XdgShell,

    window: Option<Window>,
    keyboard: Option<wl_keyboard::WlKeyboard>,
    pool: Option<SlotPool>,
    buffer: Option<Buffer>,
    width: u32,
    height: u32,

    configured: bool,
    closed: bool,
    frame_pending: bool,

    // Events gathered by the handlers since the last poll
    pending: Vec<Event>,
}

/// The one application window, backed by a Wayland xdg toplevel
pub struct WaylandPlatform {
    state: WaylandState,
    event_queue: EventQueue<WaylandState>,
    qh: QueueHandle<WaylandState>,
    format: PixelFormat,
    conn: Connection,
}

impl WaylandPlatform {
    /// Connect, create the window, check decoders and acquire the surface
    ///
    /// Steps run in that order; the first failure stops the rest.
    pub fn bootstrap(config: &WindowConfig) -> Result<Self, PlatformError> {
        info!("Connecting to Wayland display");

        let conn = Connection::connect_to_env()
            .map_err(|e| PlatformError::SubsystemInit(e.to_string()))?;
        let (globals, mut event_queue) = registry_queue_init::<WaylandState>(&conn)
            .map_err(|e| PlatformError::SubsystemInit(e.to_string()))?;
        let qh = event_queue.handle();

        let compositor_state = CompositorState::bind(&globals, &qh)
            .map_err(|e| PlatformError::SubsystemInit(format!("wl_compositor: {}", e)))?;
        let shm = Shm::bind(&globals, &qh)
            .map_err(|e| PlatformError::SubsystemInit(format!("wl_shm: {}", e)))?;

        // Create window
        let xdg_shell = XdgShell::bind(&globals, &qh)
            .map_err(|e| PlatformError::WindowCreation(format!("xdg_wm_base: {}", e)))?;
        let surface = compositor_state.create_surface(&qh);
        let window = xdg_shell.create_window(surface, WindowDecorations::RequestServer, &qh);
        window.set_title(config.title);
        window.set_app_id(config.app_id);
        window.set_min_size(Some((config.width, config.height)));
        window.set_max_size(Some((config.width, config.height)));
        window.commit();
        info!(
            "Created window \"{}\" ({}x{})",
            config.title, config.width, config.height
        );

        image_loader::init_decoders()?;

        let mut state = WaylandState {
            registry_state: RegistryState::new(&globals),
            seat_state: SeatState::new(&globals, &qh),
            output_state: OutputState::new(&globals, &qh),
            shm,
            _compositor: compositor_state,
            _xdg_shell: xdg_shell,
            window: Some(window),
            keyboard: None,
            pool: None,
            buffer: None,
            width: config.width,
            height: config.height,
            configured: false,
            closed: false,
            frame_pending: false,
            pending: Vec::new(),
        };

        // Get window surface: wait for the first configure
        while !state.configured {
            if state.closed {
                return Err(PlatformError::SurfaceAcquisition(
                    "window was closed before it was configured".to_string(),
                ));
            }
            event_queue
                .blocking_dispatch(&mut state)
                .map_err(|e| PlatformError::SurfaceAcquisition(e.to_string()))?;
        }

        let format = choose_format(state.shm.formats());
        let frame_len =
            config.width as usize * config.height as usize * PixelFormat::BYTES_PER_PIXEL;
        let pool = SlotPool::new(frame_len, &state.shm)
            .map_err(|e| PlatformError::SurfaceAcquisition(format!("shm pool: {}", e)))?;
        state.pool = Some(pool);
        info!("Window surface ready: {:?}", format);

        Ok(Self {
            state,
            event_queue,
            qh,
            format,
            conn,
        })
    }
}

impl Platform for WaylandPlatform {
    fn pixel_format(&self) -> PixelFormat {
        self.format
    }

    fn size(&self) -> (u32, u32) {
        (self.state.width, self.state.height)
    }

    fn poll_events(&mut self) -> Result<Vec<Event>> {
        if self.state.pending.is_empty() {
            self.event_queue
                .blocking_dispatch(&mut self.state)
                .context("Failed to dispatch Wayland events")?;
        } else {
            self.conn.flush().context("Failed to flush Wayland connection")?;
            self.event_queue
                .dispatch_pending(&mut self.state)
                .context("Failed to dispatch Wayland events")?;
        }
        Ok(std::mem::take(&mut self.state.pending))
    }

    fn present(&mut self, image: &Surface) -> Result<()> {
        let state = &mut self.state;
        // The compositor paces us: wait for the configure and for the last frame
        if !state.configured || state.frame_pending {
            return Ok(());
        }
        let Some(window) = state.window.as_ref() else {
            return Ok(());
        };
        let pool = state.pool.as_mut().context("No shared memory pool")?;

        let (width, height) = (state.width, state.height);
        let wl_format = to_wl_shm(self.format);

        let mut buffer = match state.buffer.take() {
            Some(buffer) => buffer,
            None => create_frame_buffer(pool, width, height, wl_format)?,
        };
        if buffer.canvas(pool).is_none() {
            // Previous frame is still held by the compositor
            buffer = create_frame_buffer(pool, width, height, wl_format)?;
        }
        let canvas = buffer.canvas(pool).context("Shared memory buffer is busy")?;

        blit_scaled(
            image,
            canvas,
            width,
            height,
            self.format,
            Rect::new(0, 0, width, height),
        )?;

        let surface = window.wl_surface();
        surface.damage_buffer(0, 0, width as i32, height as i32);
        surface.frame(&self.qh, surface.clone());
        buffer
            .attach_to(surface)
            .map_err(|e| anyhow!("Failed to attach buffer: {:?}", e))?;
        surface.commit();

        state.buffer = Some(buffer);
        state.frame_pending = true;
        Ok(())
    }

    fn shutdown(&mut self) {
        self.state.buffer = None;
        self.state.pool = None;
        self.state.keyboard = None;
        if self.state.window.take().is_some() {
            info!("Window destroyed");
        }
        if let Err(e) = self.conn.flush() {
            warn!("Failed to flush Wayland connection: {}", e);
        }
    }
}

impl CompositorHandler for WaylandState {
    fn scale_factor_changed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _new_factor: i32,
    ) {
        debug!("Scale factor changed");
    }

    fn transform_changed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _new_transform: wl_output::Transform,
    ) {
        debug!("Transform changed");
    }

    fn frame(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _time: u32,
    ) {
        self.frame_pending = false;
    }

    fn surface_enter(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _output: &wl_output::WlOutput,
    ) {
    }

    fn surface_leave(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _output: &wl_output::WlOutput,
    ) {
    }
}

impl OutputHandler for WaylandState {
    fn output_state(&mut self) -> &mut OutputState {
        &mut self.output_state
    }

    fn new_output(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _output: wl_output::WlOutput,
    ) {
        debug!("New output detected");
    }

    fn update_output(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _output: wl_output::WlOutput,
    ) {
        debug!("Output updated");
    }

    fn output_destroyed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _output: wl_output::WlOutput,
    ) {
        debug!("Output destroyed");
    }
}

impl WindowHandler for WaylandState {
    fn request_close(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _window: &Window) {
        info!("Window close requested");
        if !self.configured {
            self.closed = true;
        }
        self.pending.push(Event::Quit);
    }

    fn configure(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _window: &Window,
        configure: WindowConfigure,
        _serial: u32,
    ) {
        // Fixed size: the compositor's suggestion is ignored
        debug!("Window configured: {:?}", configure);
        self.configured = true;
        self.pending.push(Event::Other);
    }
}

impl SeatHandler for WaylandState {
    fn seat_state(&mut self) -> &mut SeatState {
        &mut self.seat_state
    }

    fn new_seat(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _seat: wl_seat::WlSeat) {
        debug!("New seat");
    }

    fn new_capability(
        &mut self,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
        seat: wl_seat::WlSeat,
        capability: Capability,
    ) {
        debug!("New capability: {:?}", capability);

        if capability == Capability::Keyboard && self.keyboard.is_none() {
            match self.seat_state.get_keyboard(qh, &seat, None) {
                Ok(keyboard) => self.keyboard = Some(keyboard),
                Err(e) => error!("Failed to get keyboard: {}", e),
            }
        }
    }

    fn remove_capability(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _seat: wl_seat::WlSeat,
        capability: Capability,
    ) {
        debug!("Capability removed: {:?}", capability);
        if capability == Capability::Keyboard {
            self.keyboard = None;
        }
    }

    fn remove_seat(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _seat: wl_seat::WlSeat) {
        debug!("Seat removed");
    }
}

impl KeyboardHandler for WaylandState {
    fn enter(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _surface: &wl_surface::WlSurface,
        _serial: u32,
        _raw: &[u32],
        _keysyms: &[Keysym],
    ) {
        debug!("Keyboard entered surface");
    }

    fn leave(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _surface: &wl_surface::WlSurface,
        _serial: u32,
    ) {
        debug!("Keyboard left surface");
    }

    fn press_key(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _serial: u32,
        event: KeyEvent,
    ) {
        debug!("Key pressed: {:?}", event.keysym);
        self.pending.push(Event::KeyDown(key_from_keysym(event.keysym)));
    }

    fn release_key(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _serial: u32,
        _event: KeyEvent,
    ) {
        self.pending.push(Event::Other);
    }

    fn update_modifiers(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _serial: u32,
        _modifiers: Modifiers,
        _layout: u32,
    ) {
    }
}

impl ShmHandler for WaylandState {
    fn shm_state(&mut self) -> &mut Shm {
        &mut self.shm
    }
}

impl ProvidesRegistryState for WaylandState {
    fn registry(&mut self) -> &mut RegistryState {
        &mut self.registry_state
    }

    registry_handlers![OutputState, SeatState];
}

// Delegate macros
delegate_compositor!(WaylandState);
delegate_output!(WaylandState);
delegate_shm!(WaylandState);
delegate_seat!(WaylandState);
delegate_keyboard!(WaylandState);
delegate_xdg_shell!(WaylandState);
delegate_xdg_window!(WaylandState);
delegate_registry!(WaylandState);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::Slot;
    use crate::input::slot_for_key;

    #[test]
    fn arrow_keysyms_map_to_arrow_keys() {
        assert_eq!(key_from_keysym(Keysym::Up), Key::Up);
        assert_eq!(key_from_keysym(Keysym::Down), Key::Down);
        assert_eq!(key_from_keysym(Keysym::Left), Key::Left);
        assert_eq!(key_from_keysym(Keysym::Right), Key::Right);
    }

    #[test]
    fn letter_o_selects_stretch_with_or_without_shift() {
        assert_eq!(slot_for_key(key_from_keysym(Keysym::o)), Slot::Stretch);
        assert_eq!(slot_for_key(key_from_keysym(Keysym::O)), Slot::Stretch);
    }

    #[test]
    fn other_keysyms_fall_back_to_default() {
        for keysym in [Keysym::space, Keysym::q, Keysym::Escape, Keysym::Shift_L] {
            assert_eq!(slot_for_key(key_from_keysym(keysym)), Slot::Default);
        }
    }

    #[test]
    fn xrgb_is_preferred_when_offered() {
        let offered = [wl_shm::Format::Argb8888, wl_shm::Format::Xrgb8888];
        assert_eq!(choose_format(&offered), PixelFormat::Xrgb8888);
        assert_eq!(
            choose_format(&[wl_shm::Format::Argb8888]),
            PixelFormat::Argb8888
        );
        assert_eq!(choose_format(&[]), PixelFormat::Xrgb8888);
    }
}
