use mirror_controller::{
    BroadcastPublisher, ChannelServer, Config, ControlLoop, DeformableMirrorController, IntoArcx,
    RateMonitor,
};

const REQUEST_QUEUE: usize = 256;
const STATUS_QUEUE: usize = 16;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = Config::from_env()?;
    log::info!("{config:?}");

    let mirror = config.mirror()?;
    // in-process request channel only, no remote transport is attached to the client
    let (server, _client) = ChannelServer::new(REQUEST_QUEUE);
    let publisher = BroadcastPublisher::new(STATUS_QUEUE, config.status_encoding);
    let mut subscriber = publisher.subscribe();
    tokio::spawn(async move {
        while let Ok(status) = subscriber.recv().await {
            log::trace!("{status}");
        }
    });

    let controller = DeformableMirrorController::new(
        config.server_name.as_str(),
        mirror,
        server.batch(config.request_batch),
        publisher,
    )
    .rate_monitor(RateMonitor::new(config.rate_interval))
    .into_arcx();
    log::info!("{}", controller.lock().await.server_info());

    let terminator = controller.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => terminator.lock().await.terminate(),
            Err(e) => log::error!("failed to listen for the shutdown signal: {e}"),
        }
    });

    log::info!("Mirror controller is running (in-process requests only).");
    let n_fault = ControlLoop::new(controller, config.loop_period).run().await;
    if n_fault > 0 {
        log::warn!("{n_fault} control loop iterations failed");
    }
    log::info!("Terminated");

    Ok(())
}
