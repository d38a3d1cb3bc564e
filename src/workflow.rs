use crate::artifact::ArtifactStore;
use crate::edit::EditClient;
use crate::errors::{StudioError, StudioResult};
use crate::nft::{CustomizationRequest, CustomizationResult, NftAsset, PaymentOutcome};
use crate::wallet::{WalletGateway, WalletSession};

/// 支払いの継ぎ目。テストではカウンタ付きスタブに差し替える
pub trait PaymentService {
    fn pay(&self, session: Option<&WalletSession>) -> PaymentOutcome;
}

/// 編集の継ぎ目
pub trait EditService {
    fn edit(&self, request: &CustomizationRequest) -> StudioResult<CustomizationResult>;
}

impl<T: PaymentService + ?Sized> PaymentService for &T {
    fn pay(&self, session: Option<&WalletSession>) -> PaymentOutcome {
        (**self).pay(session)
    }
}

impl<T: EditService + ?Sized> EditService for &T {
    fn edit(&self, request: &CustomizationRequest) -> StudioResult<CustomizationResult> {
        (**self).edit(request)
    }
}

impl PaymentService for WalletGateway {
    fn pay(&self, session: Option<&WalletSession>) -> PaymentOutcome {
        self.send_payment(session, self.payment_address(), self.payment_amount_eth())
    }
}

impl EditService for EditClient {
    fn edit(&self, request: &CustomizationRequest) -> StudioResult<CustomizationResult> {
        self.edit_asset(request)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    AwaitingPayment,
    EditingInProgress,
    Completed,
    Failed(FailureReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    PaymentDeclined,
    EditFailed(String),
}

/// 支払い → 編集 → 保存を 1 操作として束ねるワークフロー。
/// 支払いが通らない限り編集リクエストは発行しない
pub struct CustomizeWorkflow<P, E> {
    payment: P,
    edit: E,
    state: WorkflowState,
    in_flight: bool,
    result: Option<CustomizationResult>,
}

impl<P: PaymentService, E: EditService> CustomizeWorkflow<P, E> {
    pub fn new(payment: P, edit: E) -> Self {
        Self {
            payment,
            edit,
            state: WorkflowState::Idle,
            in_flight: false,
            result: None,
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// 支払い待ち〜編集中のあいだ true。UI 側の再入防止に使う
    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    pub fn result(&self) -> Option<&CustomizationResult> {
        self.result.as_ref()
    }

    /// 詳細パネルを閉じたときの後始末。終端状態は自動では戻らない
    pub fn reset(&mut self) {
        self.state = WorkflowState::Idle;
        self.result = None;
    }

    /// 1 回のカスタマイズ操作。成功時は保存キーを返す。
    /// 実行中の再入は決定的に拒否する
    pub fn run(
        &mut self,
        session: Option<&WalletSession>,
        asset: Option<&NftAsset>,
        brand: &str,
        store: &ArtifactStore,
    ) -> StudioResult<String> {
        if self.in_flight {
            return Err(StudioError::Busy);
        }

        let Some(asset) = asset else {
            return Err(StudioError::Validation(
                "NFT を選択してください".to_string(),
            ));
        };
        if brand.is_empty() {
            return Err(StudioError::Validation(
                "ブランド名を入力してください".to_string(),
            ));
        }

        self.in_flight = true;
        let outcome = self.advance(session, asset, brand, store);
        self.in_flight = false;
        outcome
    }

    fn advance(
        &mut self,
        session: Option<&WalletSession>,
        asset: &NftAsset,
        brand: &str,
        store: &ArtifactStore,
    ) -> StudioResult<String> {
        self.state = WorkflowState::AwaitingPayment;
        let payment = self.payment.pay(session);
        if !payment.success {
            self.state = WorkflowState::Failed(FailureReason::PaymentDeclined);
            return Err(StudioError::PaymentDeclined);
        }

        self.state = WorkflowState::EditingInProgress;
        let request = CustomizationRequest {
            asset: asset.clone(),
            brand: brand.to_string(),
        };
        let result = match self.edit.edit(&request) {
            Ok(result) => result,
            Err(err) => {
                self.state = WorkflowState::Failed(FailureReason::EditFailed(err.to_string()));
                return Err(err);
            }
        };

        self.result = Some(result.clone());
        self.state = WorkflowState::Completed;
        let key = store.persist(&result)?;
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::fs;

    use super::*;
    use crate::config::StorageConfig;

    struct StubPayment {
        succeed: bool,
        calls: Cell<u32>,
    }

    impl PaymentService for StubPayment {
        fn pay(&self, _session: Option<&WalletSession>) -> PaymentOutcome {
            self.calls.set(self.calls.get() + 1);
            PaymentOutcome {
                success: self.succeed,
                tx_hash: self.succeed.then(|| "0xdeadbeef".to_string()),
            }
        }
    }

    struct StubEdit {
        response: Result<String, String>,
        calls: Cell<u32>,
    }

    impl EditService for StubEdit {
        fn edit(&self, request: &CustomizationRequest) -> StudioResult<CustomizationResult> {
            self.calls.set(self.calls.get() + 1);
            match &self.response {
                Ok(image) => Ok(CustomizationResult::new(
                    image.clone(),
                    request.brand.clone(),
                )),
                Err(message) => Err(StudioError::EditFailed(message.clone())),
            }
        }
    }

    fn payment(succeed: bool) -> StubPayment {
        StubPayment {
            succeed,
            calls: Cell::new(0),
        }
    }

    fn edit(response: Result<&str, &str>) -> StubEdit {
        StubEdit {
            response: response.map(str::to_string).map_err(str::to_string),
            calls: Cell::new(0),
        }
    }

    fn scratch_store(name: &str) -> ArtifactStore {
        let base = std::env::temp_dir().join("nbs-workflow-tests").join(name);
        let _ = fs::remove_dir_all(&base);
        let cfg = StorageConfig {
            artifact_dir: base.join("artifacts").to_string_lossy().into_owned(),
            download_dir: base.join("downloads").to_string_lossy().into_owned(),
            png_compression: None,
        };
        ArtifactStore::with_clock(&cfg, || 1000)
    }

    fn asset() -> NftAsset {
        serde_json::from_str(r#"{"identifier":"1","name":"Punk #1"}"#).unwrap()
    }

    fn session() -> WalletSession {
        WalletSession {
            address: "0xabc".to_string(),
        }
    }

    #[test]
    fn missing_selection_blocks_before_payment() {
        let pay = payment(true);
        let ed = edit(Ok("data:image/png;base64,QUJD"));
        let mut wf = CustomizeWorkflow::new(&pay, &ed);
        let store = scratch_store("validation-asset");

        let err = wf.run(Some(&session()), None, "Acme", &store).unwrap_err();
        assert!(matches!(err, StudioError::Validation(_)));
        assert_eq!(*wf.state(), WorkflowState::Idle);
        assert_eq!(pay.calls.get(), 0);
        assert_eq!(ed.calls.get(), 0);
    }

    #[test]
    fn empty_brand_blocks_before_payment() {
        let pay = payment(true);
        let ed = edit(Ok("data:image/png;base64,QUJD"));
        let mut wf = CustomizeWorkflow::new(&pay, &ed);
        let store = scratch_store("validation-brand");

        let a = asset();
        let err = wf.run(Some(&session()), Some(&a), "", &store).unwrap_err();
        assert!(matches!(err, StudioError::Validation(_)));
        assert_eq!(*wf.state(), WorkflowState::Idle);
        assert_eq!(pay.calls.get(), 0);
    }

    #[test]
    fn declined_payment_never_invokes_edit() {
        let pay = payment(false);
        let ed = edit(Ok("data:image/png;base64,QUJD"));
        let mut wf = CustomizeWorkflow::new(&pay, &ed);
        let store = scratch_store("declined");

        let a = asset();
        let err = wf
            .run(Some(&session()), Some(&a), "Acme", &store)
            .unwrap_err();
        assert!(matches!(err, StudioError::PaymentDeclined));
        assert_eq!(
            *wf.state(),
            WorkflowState::Failed(FailureReason::PaymentDeclined)
        );
        assert_eq!(pay.calls.get(), 1);
        assert_eq!(ed.calls.get(), 0);
        assert!(wf.result().is_none());
        assert!(!wf.is_busy());
    }

    #[test]
    fn edit_error_fails_without_storing_result() {
        let pay = payment(true);
        let ed = edit(Err("quota exceeded"));
        let mut wf = CustomizeWorkflow::new(&pay, &ed);
        let store = scratch_store("edit-error");

        let a = asset();
        let err = wf
            .run(Some(&session()), Some(&a), "Acme", &store)
            .unwrap_err();
        assert!(matches!(err, StudioError::EditFailed(_)));
        assert!(matches!(
            wf.state(),
            WorkflowState::Failed(FailureReason::EditFailed(_))
        ));
        assert!(wf.result().is_none());
        // 保存先ディレクトリは作られてすらいない
        assert!(!std::path::Path::new(store.artifact_dir()).exists());
    }

    #[test]
    fn success_persists_under_derived_key() {
        let pay = payment(true);
        let ed = edit(Ok("data:image/png;base64,QUJD"));
        let mut wf = CustomizeWorkflow::new(&pay, &ed);
        let store = scratch_store("success");

        let a = asset();
        let key = wf.run(Some(&session()), Some(&a), "Acme", &store).unwrap();
        assert_eq!(key, "Generated_NFTs_Acme_1000");
        assert_eq!(*wf.state(), WorkflowState::Completed);
        assert_eq!(pay.calls.get(), 1);
        assert_eq!(ed.calls.get(), 1);
        assert_eq!(
            wf.result().unwrap().image,
            "data:image/png;base64,QUJD"
        );
        assert!(!wf.is_busy());
    }

    #[test]
    fn reentrant_run_is_rejected_deterministically() {
        let pay = payment(true);
        let ed = edit(Ok("data:image/png;base64,QUJD"));
        let mut wf = CustomizeWorkflow::new(&pay, &ed);
        let store = scratch_store("busy");

        wf.in_flight = true;
        let a = asset();
        let err = wf
            .run(Some(&session()), Some(&a), "Acme", &store)
            .unwrap_err();
        assert!(matches!(err, StudioError::Busy));
        assert_eq!(pay.calls.get(), 0);
        assert_eq!(ed.calls.get(), 0);
    }

    #[test]
    fn reset_returns_to_idle_and_drops_result() {
        let pay = payment(true);
        let ed = edit(Ok("data:image/png;base64,QUJD"));
        let mut wf = CustomizeWorkflow::new(&pay, &ed);
        let store = scratch_store("reset");

        let a = asset();
        wf.run(Some(&session()), Some(&a), "Acme", &store).unwrap();
        assert!(wf.result().is_some());

        wf.reset();
        assert_eq!(*wf.state(), WorkflowState::Idle);
        assert!(wf.result().is_none());
    }
}
