//! ENB load information.

use crate::handler::{HandlerError, NotificationHandler};
use crate::request::NotificationRequest;
use async_trait::async_trait;
use e2mgr_storage::{
    CellLoadInformation, RanLoadInformation, RelativeNarrowbandTxPower, RnibDataService,
    UlHighInterferenceInformation, UlInterferenceOverloadIndication,
};
use e2mgr_wire::{self as wire, InterferenceOverload, ProtocolCodec, WireError};
use std::sync::Arc;
use tracing::{debug, info};

/// Stores the latest load report of a RAN, stamped with its receipt time
pub struct EnbLoadInformationHandler {
    rnib: RnibDataService,
    codec: Arc<dyn ProtocolCodec>,
}

impl EnbLoadInformationHandler {
    /// Create the handler
    pub fn new(rnib: RnibDataService, codec: Arc<dyn ProtocolCodec>) -> Self {
        Self { rnib, codec }
    }
}

fn build_ran_load_information(
    load_timestamp: u64,
    pdu: wire::LoadInformation,
) -> Result<RanLoadInformation, WireError> {
    let cell_load_infos = pdu
        .cells
        .into_iter()
        .map(build_cell_load_information)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RanLoadInformation {
        load_timestamp,
        cell_load_infos,
    })
}

fn build_cell_load_information(
    cell: wire::CellLoadInformation,
) -> Result<CellLoadInformation, WireError> {
    if cell.cell_id.is_empty() {
        return Err(WireError::Decode {
            message: "load information",
            reason: "cell without id".to_string(),
        });
    }

    Ok(CellLoadInformation {
        cell_id: cell.cell_id,
        ul_interference_overload_indications: cell
            .ul_interference_overload
            .into_iter()
            .map(|level| match level {
                InterferenceOverload::HighInterference => {
                    UlInterferenceOverloadIndication::HighInterference
                }
                InterferenceOverload::MediumInterference => {
                    UlInterferenceOverloadIndication::MediumInterference
                }
                InterferenceOverload::LowInterference => {
                    UlInterferenceOverloadIndication::LowInterference
                }
            })
            .collect(),
        ul_high_interference_infos: cell
            .ul_high_interference
            .into_iter()
            .map(|info| UlHighInterferenceInformation {
                target_cell_id: info.target_cell_id,
                ul_high_interference_indication: info.indication,
            })
            .collect(),
        relative_narrowband_tx_power: cell.relative_narrowband_tx_power.map(|rntp| {
            RelativeNarrowbandTxPower {
                rntp_per_prb: rntp.rntp_per_prb,
                rntp_threshold_db: rntp.rntp_threshold_db,
                number_of_cell_specific_antenna_ports: rntp.antenna_ports,
                p_b: rntp.p_b,
                pdcch_interference_impact: rntp.pdcch_interference_impact,
            }
        }),
    })
}

#[async_trait]
impl NotificationHandler for EnbLoadInformationHandler {
    async fn handle(&self, request: NotificationRequest) -> Result<(), HandlerError> {
        let pdu = self.codec.decode_load_information(&request.payload)?;
        debug!("ran {}: load information for {} cells", request.ran_name, pdu.cells.len());

        let load = build_ran_load_information(request.received_at_nanos(), pdu)?;
        self.rnib
            .save_ran_load_information(&request.ran_name, &load)
            .await?;

        info!(
            "ran {}: saved load information, elapsed {:?}",
            request.ran_name,
            request.received_at.elapsed()
        );
        Ok(())
    }
}
